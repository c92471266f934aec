//! Crate-wide error taxonomy. Each subsystem gets its own enum so callers can
//! match narrowly; [`Error`] aggregates them for the operations layer. Every
//! leaf implements [`ErrorKind`], a stable machine-readable tag independent of
//! `Display`, used in `SyncHistory.error_summary` and structured logs.

use crate::checksum::Sha256Checksum;
use std::path::PathBuf;
use thiserror::Error;

/// A stable, loggable string tag for an error variant. Never changes across
/// `Display` wording revisions, so `SyncHistory` rows and dashboards built on
/// top of them remain comparable over time.
pub trait ErrorKind {
    fn kind(&self) -> &'static str;
}

impl ErrorKind for std::io::Error {
    fn kind(&self) -> &'static str {
        match self.kind() {
            std::io::ErrorKind::NotFound => "FileNotFound",
            std::io::ErrorKind::PermissionDenied => "PermissionDenied",
            std::io::ErrorKind::AlreadyExists => "FileAlreadyExists",
            std::io::ErrorKind::CrossesDevices => "CrossesDevices",
            std::io::ErrorKind::WriteZero => "WriteZero",
            std::io::ErrorKind::Interrupted => "Interrupted",
            std::io::ErrorKind::UnexpectedEof => "UnexpectedEof",
            std::io::ErrorKind::TimedOut => "TimedOut",
            _ => "OtherIoError",
        }
    }
}

impl ErrorKind for diesel::result::Error {
    fn kind(&self) -> &'static str {
        use diesel::result::DatabaseErrorKind;
        match self {
            Self::NotFound => "RowNotFound",
            Self::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => "UniqueViolation",
            Self::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => "ForeignKeyViolation",
            Self::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => "SerializationFailure",
            Self::DatabaseError(..) => "DatabaseError",
            Self::QueryBuilderError(_) => "QueryBuilderError",
            Self::DeserializationError(_) => "DeserializationError",
            Self::RollbackTransaction => "RollbackTransaction",
            Self::AlreadyInTransaction => "AlreadyInTransaction",
            _ => "UnknownQueryError",
        }
    }
}

impl ErrorKind for diesel::r2d2::PoolError {
    fn kind(&self) -> &'static str {
        "ConnectionPoolError"
    }
}

impl ErrorKind for reqwest::Error {
    fn kind(&self) -> &'static str {
        if self.is_timeout() {
            "RequestTimeout"
        } else if self.is_connect() {
            "ConnectionFailed"
        } else if self.status().map(|s| s.is_server_error()).unwrap_or(false) {
            "UpstreamServerError"
        } else if self.status().map(|s| s.as_u16() == 429).unwrap_or(false) {
            "RateLimited"
        } else if self
            .status()
            .map(|s| s.as_u16() == 401 || s.as_u16() == 403)
            .unwrap_or(false)
        {
            "AuthRejected"
        } else if self.is_decode() {
            "ResponseDecodeError"
        } else {
            "RequestError"
        }
    }
}

/// Errors raised by the content-addressed object pool (component A).
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("io error on pool path {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("downloaded content does not match expected checksum: expected {expected}, got {actual}")]
    ChecksumMismatch {
        expected: Sha256Checksum,
        actual: Sha256Checksum,
    },
    #[error("pool blob {sha256} is corrupt: on-disk content rehashes to {actual}")]
    Corrupt {
        sha256: Sha256Checksum,
        actual: Sha256Checksum,
    },
    #[error("cannot hard-link {source_path} into {target_path}: different filesystem")]
    CrossDevice { source_path: PathBuf, target_path: PathBuf },
    #[error("pool blob {0} is missing its canonical file")]
    Missing(Sha256Checksum),
}

impl ErrorKind for PoolError {
    fn kind(&self) -> &'static str {
        match self {
            Self::Io { source, .. } => ErrorKind::kind(source),
            Self::ChecksumMismatch { .. } => "ChecksumMismatch",
            Self::Corrupt { .. } => "PoolCorruption",
            Self::CrossDevice { .. } => "CrossDeviceError",
            Self::Missing(_) => "PoolMissing",
        }
    }
}

/// Errors raised by the relational metadata layer (component B).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Query(#[from] diesel::result::Error),
    #[error(transparent)]
    Connection(#[from] diesel::r2d2::PoolError),
    #[error("{entity} '{name}' not found")]
    NotFound { entity: &'static str, name: String },
    #[error("{entity} '{name}' already exists")]
    AlreadyExists { entity: &'static str, name: String },
    #[error("view snapshot '{snapshot}' is missing a sibling snapshot for repository '{repository}'")]
    IncompleteViewSnapshot { view: String, snapshot: String, repository: String },
}

impl ErrorKind for StoreError {
    fn kind(&self) -> &'static str {
        match self {
            Self::Query(err) => err.kind(),
            Self::Connection(err) => err.kind(),
            Self::NotFound { .. } => "NotFound",
            Self::AlreadyExists { .. } => "AlreadyExists",
            Self::IncompleteViewSnapshot { .. } => "IncompleteViewSnapshot",
        }
    }
}

/// Errors raised by the download manager (component C).
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Request(#[from] reqwest::Error),
    #[error(transparent)]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("downloaded content does not match expected checksum: expected {expected}, got {actual}")]
    ChecksumMismatch {
        expected: Sha256Checksum,
        actual: Sha256Checksum,
    },
    #[error("authentication failed fetching {url}: HTTP {status}")]
    Auth { url: String, status: u16 },
    #[error("download of {url} was cancelled")]
    Cancelled { url: String },
    #[error("exceeded {attempts} retry attempts fetching {url}")]
    RetriesExhausted { url: String, attempts: u32 },
}

impl ErrorKind for DownloadError {
    fn kind(&self) -> &'static str {
        match self {
            Self::Request(err) => ErrorKind::kind(err),
            Self::InvalidHeader(_) => "InvalidHeader",
            Self::Io(err) => ErrorKind::kind(err),
            Self::ChecksumMismatch { .. } => "ChecksumMismatch",
            Self::Auth { .. } => "Auth",
            Self::Cancelled { .. } => "Cancelled",
            Self::RetriesExhausted { .. } => "Network",
        }
    }
}

/// Errors raised while parsing upstream ecosystem metadata (component D).
#[derive(Debug, Error)]
pub enum ParseError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Xml(#[from] quick_xml::DeError),
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error("malformed {format} metadata: {reason}")]
    Malformed { format: &'static str, reason: String },
    #[error("unsupported compression extension: {0}")]
    UnsupportedCompression(String),
}

impl ErrorKind for ParseError {
    fn kind(&self) -> &'static str {
        match self {
            Self::Io(err) => ErrorKind::kind(err),
            Self::Xml(_) => "MalformedXml",
            Self::Yaml(_) => "MalformedYaml",
            Self::Malformed { .. } => "MalformedMetadata",
            Self::UnsupportedCompression(_) => "UnsupportedCompression",
        }
    }
}

/// Top-level crate error, aggregating every subsystem for the operations layer
/// (`sync`, `publish.*`, `snapshot.*`, `pool.*`) exposed in spec.md §6.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Download(#[from] DownloadError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("two members require the output filename '{filename}'")]
    PublishConflict { filename: String },
    #[error("could not acquire {lock_kind} lock for '{key}' within the configured timeout")]
    LockTimeout { lock_kind: &'static str, key: String },
    #[error("operation cancelled")]
    Cancelled,
    #[error("MIRROR and FILTERED semantics cannot both apply to the same sync/publish")]
    ConflictingModes,
}

impl ErrorKind for Error {
    fn kind(&self) -> &'static str {
        match self {
            Self::Pool(err) => err.kind(),
            Self::Store(err) => err.kind(),
            Self::Download(err) => err.kind(),
            Self::Parse(err) => err.kind(),
            Self::Config(_) => "Config",
            Self::PublishConflict { .. } => "PublishConflict",
            Self::LockTimeout { .. } => "LockTimeout",
            Self::Cancelled => "Cancelled",
            Self::ConflictingModes => "Config",
        }
    }
}

/// The four exit-status categories spec.md §7 requires a sync/publish summary to
/// partition failures into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Config,
    Network,
    Integrity,
    Other,
}

impl Error {
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) | Self::ConflictingModes => ErrorCategory::Config,
            Self::Download(DownloadError::Request(_) | DownloadError::RetriesExhausted { .. }) => {
                ErrorCategory::Network
            }
            Self::Pool(PoolError::ChecksumMismatch { .. } | PoolError::Corrupt { .. })
            | Self::Download(DownloadError::ChecksumMismatch { .. }) => ErrorCategory::Integrity,
            _ => ErrorCategory::Other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
