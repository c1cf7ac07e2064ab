use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;

/// Error variants that can occur in stockroom operations.
/// Each variant represents a specific error category with its associated context.
#[derive(Debug)]
pub enum ErrorKind {
    /// File system operation failed
    FileError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Catch-all for other errors with a message
    Message { message: String },
}

/// Error type wrapping ErrorKind with optional context.
/// Implements the standard Error trait and supports context attachment.
#[derive(Debug)]
pub struct StockroomError {
    kind: ErrorKind,
    context: Vec<String>,
}

impl StockroomError {
    /// Creates a new error from an ErrorKind.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: vec![],
        }
    }

    /// Creates a Message error from anything string-like.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Message {
            message: message.into(),
        })
    }

    /// Creates a FileError for the given path and io error.
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::new(ErrorKind::FileError {
            path: path.into(),
            source,
        })
    }

    /// Attaches context to an error.
    /// Context is displayed before the error message.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Attaches context using lazy evaluation.
    /// Useful to avoid expensive string construction for successful paths.
    pub fn with_context<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> String,
    {
        self.context.push(f());
        self
    }

    /// Returns a reference to the underlying ErrorKind.
    /// Allows pattern matching on specific error variants.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns the innermost error in the chain.
    /// Traverses the error source chain to find the root cause.
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        let mut current: &(dyn StdError + 'static) = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }
}

impl From<ErrorKind> for StockroomError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl StdError for StockroomError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            ErrorKind::FileError { source, .. } => Some(source),
            ErrorKind::Message { .. } => None,
        }
    }
}

impl fmt::Display for StockroomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, ctx) in self.context.iter().enumerate() {
            if i == 0 {
                write!(f, "{}", ctx)?;
            } else {
                write!(f, ": {}", ctx)?;
            }
        }

        if !self.context.is_empty() {
            write!(f, ": ")?;
        }

        match &self.kind {
            ErrorKind::FileError { path, source } => {
                write!(f, "File error at {}: {}", path.display(), source)
            }
            ErrorKind::Message { message } => {
                write!(f, "{}", message)
            }
        }
    }
}

/// Standard result type for stockroom operations.
/// The error is boxed to keep the Ok path small.
pub type StockroomResult<T> = std::result::Result<T, Box<StockroomError>>;

/// Builds a boxed `StockroomError` from a format string.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        Box::new($crate::error::StockroomError::message(format!($($arg)*)))
    };
}

/// Extension trait for attaching context to Results.
/// Provides ergonomic error context attachment during error propagation.
pub trait ResultExt<T> {
    /// Attaches context to an error, consuming and re-wrapping it.
    /// Eager evaluation: context is evaluated immediately.
    fn context(self, context: impl Into<String>) -> StockroomResult<T>;

    /// Attaches context using lazy evaluation.
    /// Context is only evaluated if the result is an error.
    /// Prefer this to avoid expensive string formatting in the success path.
    fn with_context<F>(self, f: F) -> StockroomResult<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for StockroomResult<T> {
    fn context(self, context: impl Into<String>) -> StockroomResult<T> {
        self.map_err(|err| Box::new(err.context(context)))
    }

    fn with_context<F>(self, f: F) -> StockroomResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|err| Box::new(err.with_context(f)))
    }
}
