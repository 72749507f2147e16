use std::io;

use thiserror::Error;

/// DOM File API error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ErrorKind {
    #[error("NOT_FOUND_ERR")]
    NotFound,
    #[error("SECURITY_ERR")]
    Security,
    #[error("ABORT_ERR")]
    Abort,
    #[error("NOT_READABLE_ERR")]
    NotReadable,
    #[error("ENCODING_ERR")]
    Encoding,
    #[error("NO_MODIFICATION_ALLOWED_ERR")]
    NoModificationAllowed,
    #[error("INVALID_STATE_ERR")]
    InvalidState,
    #[error("SYNTAX_ERR")]
    Syntax,
    #[error("INVALID_MODIFICATION_ERR")]
    InvalidModification,
    #[error("QUOTA_EXCEEDED_ERR")]
    QuotaExceeded,
    #[error("TYPE_MISMATCH_ERR")]
    TypeMismatch,
    #[error("PATH_EXISTS_ERR")]
    PathExists,
}

impl ErrorKind {
    /// Numeric code as exposed to File API callers
    pub fn code(self) -> u16 {
        match self {
            ErrorKind::NotFound => 1,
            ErrorKind::Security => 2,
            ErrorKind::Abort => 3,
            ErrorKind::NotReadable => 4,
            ErrorKind::Encoding => 5,
            ErrorKind::NoModificationAllowed => 6,
            ErrorKind::InvalidState => 7,
            ErrorKind::Syntax => 8,
            ErrorKind::InvalidModification => 9,
            ErrorKind::QuotaExceeded => 10,
            ErrorKind::TypeMismatch => 11,
            ErrorKind::PathExists => 12,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Security => "Security",
            ErrorKind::Abort => "Abort",
            ErrorKind::NotReadable => "NotReadable",
            ErrorKind::Encoding => "Encoding",
            ErrorKind::NoModificationAllowed => "NoModificationAllowed",
            ErrorKind::InvalidState => "InvalidState",
            ErrorKind::Syntax => "Syntax",
            ErrorKind::InvalidModification => "InvalidModification",
            ErrorKind::QuotaExceeded => "QuotaExceeded",
            ErrorKind::TypeMismatch => "TypeMismatch",
            ErrorKind::PathExists => "PathExists",
        }
    }
}

#[derive(Debug, Error)]
pub enum FileError {
    #[error("{0}")]
    File(#[from] ErrorKind),
    /// The operation exists in the File API but is not provided by the shim
    #[error("{0} is not implemented")]
    Unsupported(String),
    /// A native failure with no File API equivalent, passed through unchanged
    #[error("native I/O error: {0}")]
    Io(#[source] io::Error),
}

impl FileError {
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            FileError::File(kind) => Some(*kind),
            _ => None,
        }
    }
}

impl From<io::Error> for FileError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => FileError::File(ErrorKind::NotFound),
            io::ErrorKind::AlreadyExists => FileError::File(ErrorKind::PathExists),
            io::ErrorKind::NotADirectory => FileError::File(ErrorKind::TypeMismatch),
            _ => FileError::Io(err),
        }
    }
}

pub type Result<T, E = FileError> = std::result::Result<T, E>;
