//! Error types for the zotsync core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them for callers that want a single
//! error type. Every variant aborts the current sync pass; recovery happens
//! only when the scheduler starts the next pass.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    LocalRead(#[from] LocalReadError),

    #[error(transparent)]
    Remote(#[from] RemoteRequestError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Another pass holds the engine's run lock.
    #[error("a sync pass is already running")]
    PassInProgress,
}

// ---------------------------------------------------------------------------
// Local library errors
// ---------------------------------------------------------------------------

/// Errors from scanning the tablet's metadata records.
#[derive(Debug, Error)]
pub enum LocalReadError {
    /// The library root does not exist or is not a directory.
    #[error("library directory not found: {0}")]
    LibraryNotFound(String),

    /// Walking the library directory tree failed.
    #[error("failed to walk library directory: {0}")]
    Walk(#[from] walkdir::Error),

    /// A metadata record (or the stored file next to it) could not be read.
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A metadata record is not valid JSON.
    #[error("failed to decode metadata record '{path}': {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

// ---------------------------------------------------------------------------
// Remote catalog errors
// ---------------------------------------------------------------------------

/// Errors from the Zotero web API.
#[derive(Debug, Error)]
pub enum RemoteRequestError {
    /// HTTP-level transport error (network, TLS, timeout, etc.).
    #[error("Zotero HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API key was rejected.
    #[error("Zotero authentication failed for '{url}' (HTTP {status})")]
    AuthenticationFailed { url: String, status: u16 },

    /// The API returned a non-success status code.
    #[error("Zotero API error for '{url}' (HTTP {status})")]
    ApiError { url: String, status: u16 },

    /// The response body could not be decoded.
    #[error("Zotero response from '{url}' could not be decoded: {detail}")]
    ParseError { url: String, detail: String },

    /// A `next` link pointed back at a page already fetched.
    #[error("pagination loop detected at '{0}'")]
    PaginationLoop(String),
}

// ---------------------------------------------------------------------------
// Transfer errors
// ---------------------------------------------------------------------------

/// Errors from downloading a PDF or uploading it to the tablet.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The download request failed at the transport level.
    #[error("download of '{url}' failed: {source}")]
    Download {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The download returned a non-success status code.
    #[error("download of '{url}' returned HTTP {status}")]
    DownloadStatus { url: String, status: u16 },

    /// The upload request failed at the transport level.
    #[error("upload of '{filename}' failed: {source}")]
    Upload {
        filename: String,
        #[source]
        source: reqwest::Error,
    },

    /// The tablet rejected the upload.
    #[error("upload of '{filename}' returned HTTP {status}")]
    UploadStatus { filename: String, status: u16 },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A required environment variable is not set.
    #[error("required environment variable '{var}' is not set (config field '{field}')")]
    EnvVarMissing { var: String, field: String },

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Building the HTTP client from the config failed.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
