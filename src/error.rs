use thiserror::Error;

/// Errors raised by the request-authorization gate.
///
/// Every variant is terminal for the request that triggered it: the request
/// never leaves the client.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// No credential is stored
    #[error("Not signed in")]
    Unauthenticated,

    /// A credential is stored but is past its expiry or could not be decoded.
    ///
    /// `expired_at` is `None` when the credential was malformed.
    #[error("Session expired{}", expiry_detail(.expired_at, .current_time))]
    CredentialExpired {
        expired_at: Option<u64>,
        current_time: u64,
    },

    /// Credential storage could not be read
    #[error("Credential storage error: {0}")]
    Storage(#[from] StoreError),
}

/// Errors that can occur when decoding a bearer token locally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialError {
    /// Token does not have three dot-separated segments
    #[error("Malformed token: expected 3 segments, got {0}")]
    SegmentCount(usize),

    /// Payload segment is not valid base64url
    #[error("Malformed token payload encoding: {0}")]
    Encoding(String),

    /// Payload is not a JSON object with a numeric `exp`
    #[error("Malformed token claims: {0}")]
    Claims(String),
}

/// Errors from the client-side key-value stores.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed
    #[error("Storage I/O error at {path}: {message}")]
    Io { path: String, message: String },

    /// Backing file or stored value is not valid JSON
    #[error("Storage corrupted: {0}")]
    Corrupted(String),

    /// Lock was poisoned by a panicking writer
    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Errors surfaced by backend API calls.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// Request was blocked by the auth gate before dispatch
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Backend rejected the request with a 4xx status. `message` is the
    /// backend's text, meant to be shown verbatim. Server-side 401/403
    /// rejections land here too; only the local gate purges credentials.
    #[error("{message}")]
    Validation { status: u16, message: String },

    /// Backend returned a non-4xx error status or could not be reached
    #[error("Request failed{}: {message}", status_detail(.status))]
    RequestFailed {
        status: Option<u16>,
        message: String,
    },

    /// Response body did not match the expected schema
    #[error("Malformed response from {path}: {message}")]
    MalformedResponse { path: String, message: String },

    /// Base URL or path could not be turned into a request URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Whether retrying the same request could succeed.
    ///
    /// Auth failures and validation errors need user action first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::RequestFailed { .. })
    }
}

/// Errors that abort the export pipeline.
#[derive(Debug, Clone, Error)]
pub enum ExportError {
    /// Rasterizing the region failed (e.g. an overlay asset was blocked)
    #[error("Capture failed: {reason}")]
    CaptureFailed { reason: String },

    /// Page geometry leaves no printable area, or the scale is out of range
    #[error("Invalid page layout: {0}")]
    InvalidLayout(String),

    /// Encoding a band or the output document failed
    #[error("Encoding failed: {0}")]
    Encode(String),

    /// Writing the output file failed
    #[error("Failed to save {path}: {message}")]
    Save { path: String, message: String },
}

fn expiry_detail(expired_at: &Option<u64>, current_time: &u64) -> String {
    match expired_at {
        Some(at) => format!(" at {} (current time: {})", at, current_time),
        None => " (credential could not be decoded)".to_string(),
    }
}

fn status_detail(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" with status {}", code),
        None => String::new(),
    }
}
