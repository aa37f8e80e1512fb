use backtrace::Backtrace;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::result::Result;

use crate::{atomic, Atomic};

/// Error kinds for datastore operations
///
/// Each kind names one category of failure so callers can branch on it
/// without parsing messages.
///
/// # Examples
///
/// ```rust,ignore
/// use nedb::errors::{NedbError, ErrorKind, NedbResult};
///
/// fn example() -> NedbResult<()> {
///     Err(NedbError::new("Cannot create an index without a fieldName", ErrorKind::MissingFieldName))
/// }
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum ErrorKind {
    // Index errors
    /// A unique index already holds a different document for this key
    UniqueConstraintViolated { field: String, key: String },
    /// `ensure_index` was called without a field name
    MissingFieldName,

    // Query, update and projection errors
    /// Malformed query operator or operand
    InvalidQuery,
    /// Malformed update document (mixed modifiers and fields, unknown modifier, `_id` change)
    InvalidUpdate,
    /// A modifier was applied to a value of the wrong type or with a bad operand
    InvalidModifierOperand,
    /// Projection mixes kept and omitted fields
    InvalidProjection,

    // Document errors
    /// Document uses reserved key names or is otherwise structurally invalid
    InvalidDocument,

    // Persistence errors
    /// Only one of the two serialization hooks was supplied
    SerializationHooksAsymmetric,
    /// The deserialization hook does not undo the serialization hook
    SerializationHooksNotInverse,
    /// Too many datafile lines failed to deserialize
    TooMuchCorruption { corrupt_items: usize, total_items: usize },
    /// The datafile name is reserved (ends with `~`)
    BadFilename,

    // IO and encoding errors
    /// Generic IO error
    IOError,
    /// The file was not found
    FileNotFound,
    /// Permission denied for file operation
    PermissionDenied,
    /// Error encoding or decoding data
    EncodingError,

    // Event errors
    /// Error in event processing
    EventError,

    /// The operation is not valid in the current context
    InvalidOperation,
    /// Internal error (usually indicates a bug)
    InternalError,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::UniqueConstraintViolated { field, key } => {
                write!(f, "Unique constraint violated on '{}' for key {}", field, key)
            }
            ErrorKind::MissingFieldName => write!(f, "Missing field name"),
            ErrorKind::InvalidQuery => write!(f, "Invalid query"),
            ErrorKind::InvalidUpdate => write!(f, "Invalid update"),
            ErrorKind::InvalidModifierOperand => write!(f, "Invalid modifier operand"),
            ErrorKind::InvalidProjection => write!(f, "Invalid projection"),
            ErrorKind::InvalidDocument => write!(f, "Invalid document"),
            ErrorKind::SerializationHooksAsymmetric => write!(f, "Serialization hooks asymmetric"),
            ErrorKind::SerializationHooksNotInverse => write!(f, "Serialization hooks not inverse"),
            ErrorKind::TooMuchCorruption {
                corrupt_items,
                total_items,
            } => write!(
                f,
                "Too much corruption ({} of {} lines)",
                corrupt_items, total_items
            ),
            ErrorKind::BadFilename => write!(f, "Bad filename"),
            ErrorKind::IOError => write!(f, "IO error"),
            ErrorKind::FileNotFound => write!(f, "File not found"),
            ErrorKind::PermissionDenied => write!(f, "Permission denied"),
            ErrorKind::EncodingError => write!(f, "Encoding error"),
            ErrorKind::EventError => write!(f, "Event error"),
            ErrorKind::InvalidOperation => write!(f, "Invalid operation"),
            ErrorKind::InternalError => write!(f, "Internal error"),
        }
    }
}

impl ErrorKind {
    /// Ratio of corrupt lines for a [`ErrorKind::TooMuchCorruption`] error.
    pub fn corruption_rate(&self) -> Option<f64> {
        match self {
            ErrorKind::TooMuchCorruption {
                corrupt_items,
                total_items,
            } if *total_items > 0 => Some(*corrupt_items as f64 / *total_items as f64),
            _ => None,
        }
    }
}

/// Datastore error type.
///
/// `NedbError` carries the message, the kind and an optional cause. A backtrace is
/// captured at construction for debugging.
///
/// # Examples
///
/// ```rust,ignore
/// use nedb::errors::{NedbError, ErrorKind};
///
/// let cause = NedbError::new("IO failed", ErrorKind::IOError);
/// let err = NedbError::new_with_cause("Compaction failed", ErrorKind::IOError, cause);
/// ```
#[derive(Clone)]
pub struct NedbError {
    message: String,
    error_kind: ErrorKind,
    cause: Option<Box<NedbError>>,
    backtrace: Atomic<Backtrace>,
}

impl NedbError {
    /// Creates a new `NedbError` with the specified message and error kind.
    pub fn new(message: &str, error_kind: ErrorKind) -> Self {
        NedbError {
            message: message.to_string(),
            error_kind,
            cause: None,
            backtrace: atomic(Backtrace::new()),
        }
    }

    /// Creates a new `NedbError` chained to the error that caused it.
    pub fn new_with_cause(message: &str, error_type: ErrorKind, cause: NedbError) -> Self {
        NedbError {
            message: message.to_string(),
            error_kind: error_type,
            cause: Some(Box::new(cause)),
            backtrace: atomic(Backtrace::new()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }

    pub fn cause(&self) -> Option<&NedbError> {
        self.cause.as_deref()
    }
}

impl Display for NedbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Debug for NedbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        // print error message with stack trace followed by cause
        match &self.cause {
            Some(cause) => write!(f, "{}\nCaused by: {:?}", self.message, cause),
            None => write!(f, "{}\n{:?}", self.message, self.backtrace.read()),
        }
    }
}

impl Error for NedbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.cause {
            Some(cause) => Some(cause.as_ref()),
            None => None,
        }
    }
}

/// A result type alias for datastore operations.
pub type NedbResult<T> = Result<T, NedbError>;

impl From<std::io::Error> for NedbError {
    fn from(err: std::io::Error) -> Self {
        let error_kind = match err.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::FileNotFound,
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied,
            _ => ErrorKind::IOError,
        };
        NedbError::new(&format!("IO error: {}", err), error_kind)
    }
}

impl From<std::string::FromUtf8Error> for NedbError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        NedbError::new(
            &format!("UTF-8 encoding error: {}", err),
            ErrorKind::EncodingError,
        )
    }
}

impl From<serde_json::Error> for NedbError {
    fn from(err: serde_json::Error) -> Self {
        NedbError::new(&format!("JSON error: {}", err), ErrorKind::EncodingError)
    }
}

impl From<String> for NedbError {
    fn from(msg: String) -> Self {
        NedbError::new(&msg, ErrorKind::InternalError)
    }
}

impl From<&str> for NedbError {
    fn from(msg: &str) -> Self {
        NedbError::new(msg, ErrorKind::InternalError)
    }
}
