use std::io::Cursor;
use std::sync::Arc;

use admin_console::errors::AdminError;
use admin_console::models::{AdminUser, Permission, Role, Session};
use admin_console::session::{MemorySessionStore, SessionState, save_session};
use admin_console::upload::{
    DEFAULT_FOLDER, MAX_UPLOAD_BYTES, MockUploadTransport, SourceFile, UploadPipeline,
    UploadSlots, WEBP_QUALITY, generate_object_name, transcode_eligible, transcode_to_webp,
};

// --- Test Utilities ---

fn authed_store() -> SessionState {
    let store: SessionState = Arc::new(MemorySessionStore::new());
    let session = Session {
        token: "bearer-token".to_string(),
        user: AdminUser {
            id: "a1".to_string(),
            username: "ops".to_string(),
            display_name: None,
            role: Role::Admin,
            permissions: vec![Permission::ManageSettings],
        },
    };
    save_session(store.as_ref(), &session);
    store
}

fn pipeline(transport: Arc<MockUploadTransport>, store: SessionState) -> UploadPipeline {
    UploadPipeline::new(transport, store)
}

/// Encodes a small solid-color PNG entirely in memory.
fn png_file(name: &str) -> SourceFile {
    let img = image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(
        8,
        8,
        image::Rgba([200, 40, 40, 255]),
    ));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("in-memory PNG encode");

    SourceFile {
        name: name.to_string(),
        content_type: "image/png".to_string(),
        bytes,
    }
}

/// Encodes a small JPEG entirely in memory.
fn jpeg_file(name: &str) -> SourceFile {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        16,
        16,
        image::Rgb([10, 120, 200]),
    ));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Jpeg)
        .expect("in-memory JPEG encode");

    SourceFile {
        name: name.to_string(),
        content_type: "image/jpeg".to_string(),
        bytes,
    }
}

fn generated_stem_is_well_formed(file_name: &str) -> bool {
    let stem = file_name.split('.').next().unwrap_or_default();
    stem.len() == "ADMIN".len() + 9
        && stem.starts_with("ADMIN")
        && stem["ADMIN".len()..].chars().all(|c| c.is_ascii_digit())
}

// --- Validation Steps ---

#[tokio::test]
async fn upload_fails_without_a_token_before_any_network_call() {
    let transport = Arc::new(MockUploadTransport::new());
    let store: SessionState = Arc::new(MemorySessionStore::new());
    let pipe = pipeline(transport.clone(), store);

    let result = pipe.upload(png_file("qr.png"), DEFAULT_FOLDER, "th").await;

    assert!(matches!(result, Err(AdminError::AuthenticationMissing)));
    assert!(transport.presign_requests.lock().unwrap().is_empty());
    assert!(transport.put_requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn upload_accepts_a_file_of_exactly_the_size_ceiling() {
    let transport = Arc::new(MockUploadTransport::new());
    let pipe = pipeline(transport.clone(), authed_store());

    let file = SourceFile {
        name: "promo.mp4".to_string(),
        content_type: "video/mp4".to_string(),
        bytes: vec![0u8; MAX_UPLOAD_BYTES as usize],
    };

    let key = pipe.upload(file, DEFAULT_FOLDER, "la").await.unwrap();
    assert!(key.ends_with(".mp4"));

    let puts = transport.put_requests.lock().unwrap();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].2, MAX_UPLOAD_BYTES as usize);
}

#[tokio::test]
async fn upload_rejects_one_byte_over_the_size_ceiling() {
    let transport = Arc::new(MockUploadTransport::new());
    let pipe = pipeline(transport.clone(), authed_store());

    let file = SourceFile {
        name: "promo.mp4".to_string(),
        content_type: "video/mp4".to_string(),
        bytes: vec![0u8; MAX_UPLOAD_BYTES as usize + 1],
    };

    let result = pipe.upload(file, DEFAULT_FOLDER, "la").await;
    assert!(matches!(result, Err(AdminError::FileTooLarge { .. })));
    assert!(transport.presign_requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn upload_rejects_unknown_mime_types_outright() {
    let transport = Arc::new(MockUploadTransport::new());
    let pipe = pipeline(transport.clone(), authed_store());

    for content_type in ["application/pdf", "image/svg+xml", "text/plain"] {
        let file = SourceFile {
            name: "evil.bin".to_string(),
            content_type: content_type.to_string(),
            bytes: vec![1, 2, 3],
        };
        let result = pipe.upload(file, DEFAULT_FOLDER, "wc").await;
        assert!(
            matches!(result, Err(AdminError::UnsupportedFileType(_))),
            "{content_type} must be rejected"
        );
    }

    assert!(transport.presign_requests.lock().unwrap().is_empty());
}

// --- Transcoding ---

#[test]
fn transcode_eligibility_covers_still_images_only() {
    assert!(transcode_eligible("image/jpeg"));
    assert!(transcode_eligible("image/png"));
    assert!(!transcode_eligible("image/gif"));
    assert!(!transcode_eligible("image/webp"));
    assert!(!transcode_eligible("image/svg+xml"));
    assert!(!transcode_eligible("video/mp4"));
}

#[test]
fn transcode_rewrites_name_type_and_container() {
    let converted = transcode_to_webp(&png_file("banner.v2.png"), WEBP_QUALITY).unwrap();

    // Only the final extension is replaced.
    assert_eq!(converted.name, "banner.v2.webp");
    assert_eq!(converted.content_type, "image/webp");

    // RIFF....WEBP container magic.
    assert_eq!(&converted.bytes[..4], b"RIFF");
    assert_eq!(&converted.bytes[8..12], b"WEBP");
}

#[test]
fn transcode_fails_on_undecodable_bytes() {
    let garbage = SourceFile {
        name: "broken.png".to_string(),
        content_type: "image/png".to_string(),
        bytes: vec![0xde, 0xad, 0xbe, 0xef],
    };
    assert!(transcode_to_webp(&garbage, WEBP_QUALITY).is_err());
}

#[tokio::test]
async fn jpeg_upload_yields_a_webp_key_and_webp_capability_request() {
    let transport = Arc::new(MockUploadTransport::new());
    let pipe = pipeline(transport.clone(), authed_store());

    let key = pipe
        .upload(jpeg_file("cover.jpg"), DEFAULT_FOLDER, "th")
        .await
        .unwrap();
    assert!(key.ends_with(".webp"));

    let presigns = transport.presign_requests.lock().unwrap();
    assert_eq!(presigns.len(), 1);
    assert_eq!(presigns[0].file_type, "image/webp");
    assert_eq!(presigns[0].folder, DEFAULT_FOLDER);
    assert!(presigns[0].file_name.ends_with(".webp"));
    assert!(generated_stem_is_well_formed(&presigns[0].file_name));

    // The PUT declares the post-transcode MIME type.
    let puts = transport.put_requests.lock().unwrap();
    assert_eq!(puts[0].1, "image/webp");
}

#[tokio::test]
async fn gif_upload_passes_through_untouched() {
    let transport = Arc::new(MockUploadTransport::new());
    let pipe = pipeline(transport.clone(), authed_store());

    let file = SourceFile {
        name: "sticker.gif".to_string(),
        content_type: "image/gif".to_string(),
        // Not a decodable GIF; it must never be decoded.
        bytes: vec![0x47, 0x49, 0x46, 0x38],
    };

    let key = pipe.upload(file, "stickers", "th").await.unwrap();
    assert!(key.ends_with(".gif"));

    let presigns = transport.presign_requests.lock().unwrap();
    assert_eq!(presigns[0].file_type, "image/gif");
}

#[tokio::test]
async fn undecodable_image_falls_back_to_the_original_bytes() {
    let transport = Arc::new(MockUploadTransport::new());
    let pipe = pipeline(transport.clone(), authed_store());

    let file = SourceFile {
        name: "claims-to-be.png".to_string(),
        content_type: "image/png".to_string(),
        bytes: vec![9, 9, 9, 9, 9],
    };

    // Transcoding is best-effort: the upload still succeeds, untranscoded.
    let key = pipe.upload(file, DEFAULT_FOLDER, "th").await.unwrap();
    assert!(key.ends_with(".png"));

    let presigns = transport.presign_requests.lock().unwrap();
    assert_eq!(presigns[0].file_type, "image/png");
    let puts = transport.put_requests.lock().unwrap();
    assert_eq!(puts[0].2, 5);
}

// --- Name Generation ---

#[test]
fn generated_names_keep_the_extension_and_randomize_the_stem() {
    let name = generate_object_name("ticket.jpeg");
    assert!(name.ends_with(".jpeg"));
    assert!(generated_stem_is_well_formed(&name));
}

#[test]
fn generated_names_without_extension_stay_bare() {
    let name = generate_object_name("README");
    assert!(!name.contains('.'));
    assert!(generated_stem_is_well_formed(&name));
}

// --- Failure Ordering ---

#[tokio::test]
async fn presign_failure_aborts_before_any_storage_put() {
    let transport = Arc::new(MockUploadTransport::new_failing_presign());
    let pipe = pipeline(transport.clone(), authed_store());

    let result = pipe.upload(jpeg_file("cover.jpg"), DEFAULT_FOLDER, "th").await;
    assert!(matches!(result, Err(AdminError::CapabilityRequest(_))));

    // The capability request happened; the storage endpoint was never called.
    assert_eq!(transport.presign_requests.lock().unwrap().len(), 1);
    assert!(transport.put_requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn storage_rejection_surfaces_as_a_transfer_error() {
    let transport = Arc::new(MockUploadTransport::new_failing_put());
    let pipe = pipeline(transport.clone(), authed_store());

    let result = pipe.upload(jpeg_file("cover.jpg"), DEFAULT_FOLDER, "th").await;
    assert!(matches!(result, Err(AdminError::Transfer(403))));
}

// --- Result & Slots ---

#[tokio::test]
async fn returned_key_is_the_grant_key_verbatim() {
    let transport = Arc::new(MockUploadTransport::new());
    let pipe = pipeline(transport.clone(), authed_store());

    let key = pipe.upload(jpeg_file("cover.jpg"), "banners", "wc").await.unwrap();

    let presigns = transport.presign_requests.lock().unwrap();
    assert_eq!(key, format!("banners/{}", presigns[0].file_name));
}

#[tokio::test]
async fn slot_flag_is_clear_after_success_and_after_failure() {
    let ok_transport = Arc::new(MockUploadTransport::new());
    let pipe = pipeline(ok_transport, authed_store());

    assert!(!pipe.in_flight("th"));
    pipe.upload(jpeg_file("a.jpg"), DEFAULT_FOLDER, "th").await.unwrap();
    assert!(!pipe.in_flight("th"));

    let failing = Arc::new(MockUploadTransport::new_failing_presign());
    let pipe = pipeline(failing, authed_store());
    let _ = pipe.upload(jpeg_file("b.jpg"), DEFAULT_FOLDER, "la").await;

    // Errors must leave the in-flight indicator cleared too.
    assert!(!pipe.in_flight("la"));
}

#[test]
fn slot_stays_in_flight_until_every_overlapping_upload_finishes() {
    let slots = UploadSlots::default();

    let first = slots.begin("avatar");
    let second = slots.begin("avatar");
    assert!(slots.in_flight("avatar"));

    // The first upload finishing must not clear the flag for the second.
    drop(first);
    assert!(slots.in_flight("avatar"));

    drop(second);
    assert!(!slots.in_flight("avatar"));
}

#[test]
fn slots_do_not_interfere_across_identifiers() {
    let slots = UploadSlots::default();

    let guard = slots.begin("banner");
    assert!(slots.in_flight("banner"));
    assert!(!slots.in_flight("avatar"));

    drop(guard);
    assert!(!slots.in_flight("banner"));
}
