//! Error taxonomy for parse, build, and sizeof failures.
//!
//! Every failure carries the dotted field path from the root construct and
//! the stream position at the point of failure. Enclosing structs prepend
//! their field name as the error bubbles up, so `header.payload_size` reads
//! from the outside in.

use crate::value::Value;

pub type Result<T> = std::result::Result<T, Error>;

/// What went wrong, without location information.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ErrorKind {
    #[error("unexpected end of stream: needed {needed} more byte(s), found {found}")]
    UnexpectedEnd { needed: u64, found: u64 },
    #[error("constant mismatch: expected {expected:?}, found {found:?}")]
    ConstMismatch { expected: Value, found: Value },
    #[error("length mismatch: declared {declared}, got {actual}")]
    LengthMismatch { declared: u64, actual: u64 },
    #[error("value {value} does not fit into {bits} bit(s)")]
    OutOfRange { value: i128, bits: u32 },
    #[error("framing error: {0}")]
    Framing(String),
    #[error("no case matches {0:?} and no default was given")]
    SwitchNoMatch(Value),
    #[error("no label is mapped to value {0:?}")]
    UnknownEnumValue(Value),
    #[error("label {0:?} is not defined")]
    UnknownEnumLabel(String),
    #[error("checksum mismatch: got {actual}, computed {expected}")]
    ChecksumMismatch { actual: String, expected: String },
    #[error("adapter failed: {0}")]
    Adapter(String),
    #[error("size depends on data not yet seen: {0}")]
    SizeofUnknown(String),
    #[error("expected {expected} value, found {found}")]
    Type {
        expected: &'static str,
        found: &'static str,
    },
    #[error("{0}")]
    Raised(String),
}

/// An [`ErrorKind`] located at a field path and a stream position.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    path: Vec<String>,
    position: u64,
}

impl Error {
    pub fn new(kind: ErrorKind, position: u64) -> Self {
        Error {
            kind,
            path: Vec::new(),
            position,
        }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Stream position at the point of failure, in bytes from the start of
    /// the top-level operation.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Dotted field path from the root construct, empty at the root itself.
    pub fn path(&self) -> String {
        self.path.join(".")
    }

    /// Prepend a field name as the error leaves an enclosing aggregate.
    pub(crate) fn within(mut self, field: &str) -> Self {
        self.path.insert(0, field.to_string());
        self
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{} (at byte {})", self.kind, self.position)
        } else {
            write!(
                f,
                "{} (at `{}`, byte {})",
                self.kind,
                self.path(),
                self.position
            )
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}
