use async_trait::async_trait;
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::errors::{AdminError, Result};
use crate::models::{PresignGrant, PresignUrlRequest};
use crate::session::{SessionState, TOKEN_KEY};

/// Hard ceiling on upload size, inclusive: a file of exactly this many bytes
/// is accepted, one byte more is rejected.
pub const MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Destination folder used when the caller does not pick one.
pub const DEFAULT_FOLDER: &str = "system";

/// Fixed quality factor for the WebP re-encode.
pub const WEBP_QUALITY: f32 = 0.8;

/// Fixed literal prefix of every generated object name.
const NAME_PREFIX: &str = "ADMIN";

/// MIME types accepted by the pipeline. Anything else is rejected outright,
/// never passed through best-effort.
const ALLOWED_TYPES: [&str; 8] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/gif",
    "image/webp",
    "video/mp4",
    "video/webm",
    "video/quicktime",
];

/// SourceFile
///
/// A raw file as selected by the operator: name, declared MIME type, bytes.
/// The pipeline owns it for the duration of one upload call.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl SourceFile {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

// 1. UploadTransport Contract
/// UploadTransport
///
/// Defines the abstract contract for the two network hops of an upload: the
/// capability request against the platform backend, and the direct PUT against
/// the granted storage URL. This trait allows us to swap the concrete
/// implementation—from the real HTTP client (HttpUploadTransport) in production
/// to the recording mock (MockUploadTransport) during testing—without touching
/// the pipeline's validation and transcoding logic.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    /// Requests a write capability (presigned URL + final storage key) for the
    /// generated name, declared MIME type, and destination folder.
    async fn request_capability(
        &self,
        token: &str,
        request: &PresignUrlRequest,
    ) -> Result<PresignGrant>;

    /// Performs the direct PUT of the file bytes to the granted URL, with
    /// `Content-Type` matching the declared MIME type.
    async fn put_object(&self, upload_url: &str, content_type: &str, bytes: Vec<u8>)
    -> Result<()>;
}

/// TransportState
///
/// The concrete type used to share the transport across upload widgets.
pub type TransportState = Arc<dyn UploadTransport>;

// 2. The Real Implementation (reqwest)
/// HttpUploadTransport
///
/// The concrete implementation backed by `reqwest`. The capability request
/// carries the bearer token; the storage PUT does not (the presigned URL *is*
/// the authorization).
#[derive(Clone)]
pub struct HttpUploadTransport {
    client: reqwest::Client,
    api_base_url: String,
}

impl HttpUploadTransport {
    pub fn new(api_base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl UploadTransport for HttpUploadTransport {
    async fn request_capability(
        &self,
        token: &str,
        request: &PresignUrlRequest,
    ) -> Result<PresignGrant> {
        let url = format!("{}/files/presign-url", self.api_base_url);

        // Backend rejection and unreachability are both capability errors:
        // either way no storage write has been authorized. No retry.
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(request)
            .send()
            .await
            .map_err(|err| AdminError::CapabilityRequest(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdminError::CapabilityRequest(format!(
                "backend answered {status}"
            )));
        }

        response
            .json::<PresignGrant>()
            .await
            .map_err(|err| AdminError::CapabilityRequest(err.to_string()))
    }

    async fn put_object(
        &self,
        upload_url: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<()> {
        let response = self
            .client
            .put(upload_url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AdminError::Transfer(status.as_u16()));
        }

        Ok(())
    }
}

// 3. The Mock Implementation (For Tests)
/// MockUploadTransport
///
/// A recording mock of `UploadTransport` used exclusively in tests. It captures
/// every capability request and every PUT so assertions can verify, e.g., that
/// a failed presign never reaches the storage endpoint.
#[derive(Default)]
pub struct MockUploadTransport {
    /// When true, capability requests return a simulated backend rejection.
    pub fail_presign: bool,
    /// When true, storage PUTs return a simulated 403.
    pub fail_put: bool,
    /// Every capability request received, in order.
    pub presign_requests: Mutex<Vec<PresignUrlRequest>>,
    /// Every PUT received: (upload_url, content_type, byte count).
    pub put_requests: Mutex<Vec<(String, String, usize)>>,
}

impl MockUploadTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing_presign() -> Self {
        Self {
            fail_presign: true,
            ..Self::default()
        }
    }

    pub fn new_failing_put() -> Self {
        Self {
            fail_put: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl UploadTransport for MockUploadTransport {
    async fn request_capability(
        &self,
        _token: &str,
        request: &PresignUrlRequest,
    ) -> Result<PresignGrant> {
        if let Ok(mut seen) = self.presign_requests.lock() {
            seen.push(request.clone());
        }

        if self.fail_presign {
            return Err(AdminError::CapabilityRequest(
                "mock backend rejected the presign request".to_string(),
            ));
        }

        Ok(PresignGrant {
            upload_url: format!(
                "http://localhost:9000/mock-bucket/{}/{}?signature=fake",
                request.folder, request.file_name
            ),
            key: format!("{}/{}", request.folder, request.file_name),
        })
    }

    async fn put_object(
        &self,
        upload_url: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<()> {
        if let Ok(mut seen) = self.put_requests.lock() {
            seen.push((upload_url.to_string(), content_type.to_string(), bytes.len()));
        }

        if self.fail_put {
            return Err(AdminError::Transfer(403));
        }

        Ok(())
    }
}

// 4. Per-Slot In-Flight Tracking

/// UploadSlots
///
/// "In flight" flags keyed by a caller-chosen slot identifier, so several
/// independent upload widgets on one page never interfere with each other's
/// indicators. Each slot holds a count of active guards, not a boolean: two
/// concurrent uploads sharing a slot stay in flight until both finish, rather
/// than the first completion clearing the flag out from under the second.
#[derive(Clone, Default)]
pub struct UploadSlots {
    active: Arc<Mutex<HashMap<String, usize>>>,
}

impl UploadSlots {
    /// Marks a slot in flight for the lifetime of the returned guard. The flag
    /// clears when the last guard for the slot drops, on success, on error,
    /// and when an upload future is abandoned mid-flight — a widget unmounting
    /// must not leave its slot stuck.
    pub fn begin(&self, slot: &str) -> SlotGuard {
        if let Ok(mut active) = self.active.lock() {
            *active.entry(slot.to_string()).or_insert(0) += 1;
        }
        SlotGuard {
            slots: self.active.clone(),
            slot: slot.to_string(),
        }
    }

    /// Whether at least one upload is currently in flight for this slot.
    pub fn in_flight(&self, slot: &str) -> bool {
        self.active
            .lock()
            .map(|active| active.get(slot).copied().unwrap_or(0) > 0)
            .unwrap_or(false)
    }
}

/// Keeps a slot's in-flight count raised until dropped.
pub struct SlotGuard {
    slots: Arc<Mutex<HashMap<String, usize>>>,
    slot: String,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        if let Ok(mut active) = self.slots.lock() {
            if let Some(count) = active.get_mut(&self.slot) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    active.remove(&self.slot);
                }
            }
        }
    }
}

// 5. The Pipeline

/// UploadPipeline
///
/// Runs the full direct-to-storage upload flow for one file:
///
/// 1. auth precondition (bearer token must be stored);
/// 2. size validation (100 MiB ceiling, inclusive);
/// 3. type validation against the fixed allow-list;
/// 4. best-effort WebP transcode for still images;
/// 5. randomized destination name generation;
/// 6. capability request against the backend;
/// 7. direct PUT of the bytes to the granted URL.
///
/// Every step fails fast with its typed error; nothing is retried internally.
/// The returned storage key is the backend's, verbatim — persisting it is the
/// caller's job.
pub struct UploadPipeline {
    transport: TransportState,
    session: SessionState,
    slots: UploadSlots,
}

impl UploadPipeline {
    pub fn new(transport: TransportState, session: SessionState) -> Self {
        Self {
            transport,
            session,
            slots: UploadSlots::default(),
        }
    }

    /// Whether an upload is currently in flight for the given slot.
    pub fn in_flight(&self, slot: &str) -> bool {
        self.slots.in_flight(slot)
    }

    /// upload
    ///
    /// Uploads one file into `folder`, tracking the operation under `slot`.
    /// Returns the storage key identifying the uploaded object.
    pub async fn upload(&self, file: SourceFile, folder: &str, slot: &str) -> Result<String> {
        let _slot = self.slots.begin(slot);

        // 1. Auth precondition: never touch the network without a token.
        let token = self
            .session
            .get(TOKEN_KEY)
            .ok_or(AdminError::AuthenticationMissing)?;

        // 2. Size validation. The ceiling is inclusive.
        if file.size() > MAX_UPLOAD_BYTES {
            return Err(AdminError::FileTooLarge { size: file.size() });
        }

        // 3. Type validation.
        if !ALLOWED_TYPES.contains(&file.content_type.as_str()) {
            return Err(AdminError::UnsupportedFileType(file.content_type));
        }

        // 4. Best-effort transcode. A decode or encode failure falls back to
        // the original bytes; it never fails the upload.
        let file = if transcode_eligible(&file.content_type) {
            match transcode_to_webp(&file, WEBP_QUALITY) {
                Ok(converted) => {
                    tracing::debug!(
                        original = %file.name,
                        converted = %converted.name,
                        before = file.bytes.len(),
                        after = converted.bytes.len(),
                        "re-encoded image as WebP"
                    );
                    converted
                }
                Err(err) => {
                    tracing::warn!(name = %file.name, %err, "WebP conversion failed, falling back to original");
                    file
                }
            }
        } else {
            file
        };

        // 5. Randomized destination name, preserving the (post-transcode)
        // extension. No collision handling: the 10^9 name space is treated as
        // collision-safe for this system's volume.
        let generated_name = generate_object_name(&file.name);

        // 6. Capability request.
        let request = PresignUrlRequest {
            file_name: generated_name,
            file_type: file.content_type.clone(),
            folder: folder.to_string(),
        };
        let grant = self.transport.request_capability(&token, &request).await?;

        // 7. Direct transfer to storage.
        self.transport
            .put_object(&grant.upload_url, &file.content_type, file.bytes)
            .await?;

        tracing::info!(key = %grant.key, "upload completed");
        Ok(grant.key)
    }
}

// 6. Pure Helpers

/// TranscodeError
///
/// Failure modes of the WebP re-encode. This never crosses the pipeline
/// boundary: it is logged and recovered by falling back to the original file.
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("image decode failed: {0}")]
    Decode(#[from] image::ImageError),
}

/// transcode_eligible
///
/// Still images only: GIF keeps its animation, WebP is already the target
/// format, and SVG keeps its vector fidelity. Videos are never transcoded.
pub fn transcode_eligible(content_type: &str) -> bool {
    content_type.starts_with("image/")
        && content_type != "image/gif"
        && content_type != "image/webp"
        && content_type != "image/svg+xml"
}

/// transcode_to_webp
///
/// Decodes the source into a raster surface and re-encodes it as lossy WebP at
/// the given quality factor (0.0..=1.0), preserving the original pixel
/// dimensions. The result carries the original name with its extension
/// replaced by `.webp` and an `image/webp` MIME type.
pub fn transcode_to_webp(
    file: &SourceFile,
    quality: f32,
) -> std::result::Result<SourceFile, TranscodeError> {
    let decoded = image::load_from_memory(&file.bytes)?;
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();

    let encoded = webp::Encoder::from_rgba(rgba.as_raw(), width, height).encode(quality * 100.0);

    Ok(SourceFile {
        name: replace_extension(&file.name, "webp"),
        content_type: "image/webp".to_string(),
        bytes: encoded.to_vec(),
    })
}

/// generate_object_name
///
/// Produces the randomized destination filename: the fixed `ADMIN` prefix
/// followed by 9 random decimal digits, keeping the source file's extension.
/// A source name with no extension yields a bare generated name.
pub fn generate_object_name(original_name: &str) -> String {
    let digits: u32 = rand::thread_rng().gen_range(0..1_000_000_000);
    let generated = format!("{NAME_PREFIX}{digits:09}");

    match extension_of(original_name) {
        Some(extension) => format!("{generated}.{extension}"),
        None => generated,
    }
}

/// The extension after the last dot, if any.
fn extension_of(name: &str) -> Option<&str> {
    match name.rsplit_once('.') {
        Some((stem, extension)) if !stem.is_empty() && !extension.is_empty() => Some(extension),
        _ => None,
    }
}

/// Replaces (or appends) the extension of a filename.
fn replace_extension(name: &str, extension: &str) -> String {
    match name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => format!("{stem}.{extension}"),
        _ => format!("{name}.{extension}"),
    }
}
