/// asset_url
///
/// Turns a stored object key into a displayable absolute URL against the
/// configured storage host. Values that are already absolute URLs or data URIs
/// pass through unchanged, so settings that predate the presigned-upload flow
/// keep working.
pub fn asset_url(asset_base_url: &str, key: &str) -> String {
    if key.is_empty() {
        return String::new();
    }
    if key.starts_with("http") || key.starts_with("data:") {
        return key.to_string();
    }

    let base = asset_base_url.trim_end_matches('/');

    // Ensure the key joins with exactly one slash.
    if key.starts_with('/') {
        format!("{base}{key}")
    } else {
        format!("{base}/{key}")
    }
}
