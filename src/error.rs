//! Error types for depot operations

use thiserror::Error;

/// Depot operation result type
pub type Result<T> = std::result::Result<T, DepotError>;

/// Coarse error classification exposed alongside the message.
///
/// Transport layers map these onto status codes; the variants of
/// [`DepotError`] carry the operation-specific detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unknown name, version, folder, or content hash
    NotFound,
    /// Non-retriable race or a structurally conflicting request
    Conflict,
    /// Caller is neither the owner nor a granted principal
    Unauthorized,
    /// Malformed name, path, or principal
    Validation,
    /// Per-identity admission quota exceeded
    RateLimited,
    /// Blob or ownership backend timed out or failed
    BackendUnavailable,
}

/// Admission gate that rejected a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateGate {
    /// General request window
    Requests,
    /// Upload window
    Uploads,
}

impl std::fmt::Display for RateGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateGate::Requests => write!(f, "request window"),
            RateGate::Uploads => write!(f, "upload window"),
        }
    }
}

/// Depot operation errors
#[derive(Error, Debug)]
pub enum DepotError {
    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("version {version} not found for file: {name}")]
    VersionNotFound { name: String, version: u64 },

    #[error("folder not found: {0}")]
    FolderNotFound(String),

    #[error("no blob stored for hash: {0}")]
    BlobNotFound(String),

    #[error("folder not empty: {0}")]
    FolderNotEmpty(String),

    #[error("cannot remove the root folder")]
    RootFolderImmutable,

    #[error("concurrent update conflict on file: {0}")]
    VersionConflict(String),

    #[error("principal '{principal}' is not authorized on file: {name}")]
    Unauthorized { name: String, principal: String },

    #[error("invalid file name: {0}")]
    InvalidFileName(String),

    #[error("invalid folder path: {0}")]
    InvalidFolderPath(String),

    #[error("invalid principal: {0}")]
    InvalidPrincipal(String),

    #[error("rate limit exceeded for '{identity}' ({gate})")]
    RateLimited { identity: String, gate: RateGate },

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl DepotError {
    /// Classify this error into the coarse taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FileNotFound(_)
            | Self::VersionNotFound { .. }
            | Self::FolderNotFound(_)
            | Self::BlobNotFound(_) => ErrorKind::NotFound,
            Self::FolderNotEmpty(_) | Self::RootFolderImmutable | Self::VersionConflict(_) => {
                ErrorKind::Conflict
            }
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::InvalidFileName(_) | Self::InvalidFolderPath(_) | Self::InvalidPrincipal(_) => {
                ErrorKind::Validation
            }
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::BackendUnavailable(_) => ErrorKind::BackendUnavailable,
        }
    }
}
