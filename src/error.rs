//! Error types for the PDF structural layer.
//!
//! All fallible operations in this crate return [`Result`]. Errors carry a
//! context path built up by the layers they pass through, so a failure deep
//! in the xref chain reads like a breadcrumb trail.

/// Result type alias for operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while reading or writing PDF structure.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The file violates the PDF grammar or a structural invariant
    /// (missing `startxref`, malformed xref entry, wrong generation, ...).
    #[error("corrupted file: {reason}")]
    Corrupted {
        /// What was violated
        reason: String,
    },

    /// A required read went past the end of the byte source.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// The textual parser expected a specific token.
    #[error("parse error at byte {offset}: expected {expected}")]
    Parse {
        /// Byte offset where the parser stopped
        offset: u64,
        /// What the parser was looking for
        expected: String,
    },

    /// Filter, encryption algorithm, or predictor not implemented.
    #[error("unsupported feature: {0}")]
    Unsupported(String),

    /// Encryption setup succeeded syntactically but the password did not verify.
    #[error("password verification failed")]
    AuthFailure,

    /// The underlying byte source failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A lower-level error annotated with the operation that hit it.
    #[error("{context}: {source}")]
    Context {
        /// The operation being performed, e.g. "xref entry for object 3 gen 0"
        context: String,
        /// The underlying error
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Shorthand for [`Error::Corrupted`].
    pub fn corrupted(reason: impl Into<String>) -> Self {
        Error::Corrupted {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`Error::Parse`].
    pub fn parse(offset: u64, expected: impl Into<String>) -> Self {
        Error::Parse {
            offset,
            expected: expected.into(),
        }
    }

    /// Walk past `Context` wrappers to the root error.
    pub fn root(&self) -> &Error {
        match self {
            Error::Context { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Extension trait that annotates errors with the operation in progress.
pub trait ResultExt<T> {
    /// Wrap the error in a [`Error::Context`] layer.
    fn context(self, ctx: impl FnOnce() -> String) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, ctx: impl FnOnce() -> String) -> Result<T> {
        self.map_err(|e| Error::Context {
            context: ctx(),
            source: Box::new(e),
        })
    }
}
