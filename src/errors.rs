use thiserror::Error;

/// AdminError
///
/// The single error taxonomy for every operation the console client performs.
/// Each variant is scoped to the one operation that raised it; no error here is
/// fatal to the host application, and callers are expected to surface the message
/// to the operator and return the UI to its idle state.
#[derive(Debug, Error)]
pub enum AdminError {
    /// No bearer token is present in the session store. Raised synchronously,
    /// before any network call is attempted.
    #[error("no authentication token found")]
    AuthenticationMissing,

    /// The resolved identity does not carry an admin-grade role. This is a
    /// client-side-known rejection (e.g. a CREATOR account attempting to log
    /// into the console).
    #[error("access denied: administrator role required")]
    AuthorizationDenied,

    /// The backend answered 401 on an authenticated call. The interceptor has
    /// already cleared the persisted session by the time this is returned.
    #[error("session is no longer valid, please sign in again")]
    SessionExpired,

    /// The selected file exceeds the hard 100 MiB upload ceiling.
    #[error("file size too large ({size} bytes), maximum size is 100MB")]
    FileTooLarge { size: u64 },

    /// The file's MIME type is outside the upload allow-list. Unknown types
    /// are rejected outright, never passed through best-effort.
    #[error("invalid file type '{0}', allowed: JPEG, PNG, GIF, WebP, MP4, WebM, MOV")]
    UnsupportedFileType(String),

    /// The presign endpoint rejected the capability request or was unreachable.
    /// The storage endpoint is never contacted when this is raised.
    #[error("failed to get presigned upload URL: {0}")]
    CapabilityRequest(String),

    /// The storage endpoint rejected the direct PUT of the file bytes.
    #[error("upload to storage failed with status {0}")]
    Transfer(u16),

    /// Any other non-2xx backend response, with the backend's own `message`
    /// field surfaced when one was provided.
    #[error("server rejected the request ({status}): {message}")]
    ServerRejected { status: u16, message: String },

    /// Generic transport failure (DNS, connect, body read) from the HTTP layer.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
}

/// Convenience alias used across the crate.
pub type Result<T> = std::result::Result<T, AdminError>;
