//! Error types shared across pullexec crates.

use std::error::Error;
use std::fmt;

pub type Result<T, E = PullexecError> = std::result::Result<T, E>;

/// Coarse error classification.
///
/// Lets callers distinguish "already torn down" from protocol misuse without
/// matching on message strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A cursor or other resource was used after being closed.
    Closed,
    /// An operation was called outside of the iteration protocol.
    InvalidOperation,
    /// An internal invariant was violated. Indicates a bug.
    Internal,
    /// Catch-all.
    Other,
}

#[derive(Debug)]
pub struct PullexecError {
    kind: ErrorKind,
    msg: String,
    source: Option<Box<dyn Error + Send + Sync>>,
    fields: Vec<(&'static str, String)>,
}

impl PullexecError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Other, msg)
    }

    pub fn with_kind(kind: ErrorKind, msg: impl Into<String>) -> Self {
        PullexecError {
            kind,
            msg: msg.into(),
            source: None,
            fields: Vec::new(),
        }
    }

    pub fn closed(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Closed, msg)
    }

    pub fn invalid_operation(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::InvalidOperation, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_kind(ErrorKind::Internal, msg)
    }

    pub fn with_source(mut self, source: impl Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Attach a key/value pair to the error for extra context during debugging.
    pub fn with_field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        self.fields.push((key, value.to_string()));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Display for PullexecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg)?;
        if !self.fields.is_empty() {
            write!(f, " (")?;
            for (idx, (key, value)) in self.fields.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}: {value}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl Error for PullexecError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_ref().map(|s| s.as_ref() as _)
    }
}

pub trait OptionExt<T> {
    /// Return an internal error if the option is None.
    fn required(self, msg: &'static str) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn required(self, msg: &'static str) -> Result<T> {
        match self {
            Some(v) => Ok(v),
            None => Err(PullexecError::internal(msg)),
        }
    }
}

pub trait ResultExt<T> {
    /// Wrap an error with additional context.
    fn context(self, msg: &'static str) -> Result<T>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Error + Send + Sync + 'static,
{
    fn context(self, msg: &'static str) -> Result<T> {
        match self {
            Ok(v) => Ok(v),
            Err(e) => Err(PullexecError::new(msg).with_source(e)),
        }
    }
}
