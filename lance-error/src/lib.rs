#![deny(missing_docs)]

//! Error types for the Lance columnar file engine.
//!
//! Every fallible operation in the engine returns a [`LanceResult`]. Errors are
//! a closed taxonomy: callers can match on the failure kind (e.g. to translate
//! it across an FFI boundary) while the payload carries enough context to
//! diagnose the failure without opening the file in a hex editor.

use std::borrow::Cow;
use std::fmt::{Debug, Display, Formatter};
use std::ops::Deref;

/// A result type whose error is [`LanceError`].
pub type LanceResult<T> = Result<T, LanceError>;

/// A wrapper around a possibly-static error message.
#[derive(Clone, PartialEq, Eq)]
pub struct ErrString(Cow<'static, str>);

impl<T> From<T> for ErrString
where
    T: Into<Cow<'static, str>>,
{
    fn from(msg: T) -> Self {
        Self(msg.into())
    }
}

impl Display for ErrString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl Debug for ErrString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Deref for ErrString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// The closed set of failures surfaced by the engine.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LanceError {
    /// The file does not carry the Lance magic marker, or its trailer cannot
    /// be located.
    #[error("not a lance file: {0}")]
    NotALanceFile(ErrString),
    /// The file carries a format version this build does not understand.
    #[error("unsupported version: {0}")]
    UnsupportedVersion(ErrString),
    /// A chunk's encoded bytes fail validation while decoding.
    #[error("corrupt encoding: {0}")]
    CorruptEncoding(ErrString),
    /// A requested row index or range lies outside the file.
    #[error("out of range: {0}")]
    OutOfRange(ErrString),
    /// A batch's schema disagrees with the schema established by the first
    /// write.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(ErrString),
    /// The writer has already terminated (committed or aborted).
    #[error("writer closed: {0}")]
    WriterClosed(ErrString),
    /// `commit` was called a second time.
    #[error("already committed: {0}")]
    AlreadyCommitted(ErrString),
    /// An argument failed validation before any I/O took place.
    #[error("invalid argument: {0}")]
    InvalidArgument(ErrString),
    /// An underlying I/O operation failed. Never retried internally.
    #[error(transparent)]
    IoFailure(#[from] std::io::Error),
    /// A failure crossing the Arrow interop seam.
    #[error(transparent)]
    ArrowError(#[from] arrow_schema::ArrowError),
}

/// Construct a [`LanceError`].
///
/// The first form selects a variant by name; the bare form produces an
/// `InvalidArgument`.
///
/// ```
/// use lance_error::{lance_err, LanceError};
///
/// let err = lance_err!(OutOfRange: "index {} >= row count {}", 10, 4);
/// assert!(matches!(err, LanceError::OutOfRange(_)));
/// ```
#[macro_export]
macro_rules! lance_err {
    ($variant:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::LanceError::$variant(format!($fmt $(, $arg)*).into())
    };
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        $crate::LanceError::InvalidArgument(format!($fmt $(, $arg)*).into())
    };
}

/// Return early with a [`LanceError`]. Accepts the same forms as
/// [`lance_err!`].
#[macro_export]
macro_rules! lance_bail {
    ($variant:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {
        return Err($crate::lance_err!($variant: $fmt $(, $arg)*))
    };
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        return Err($crate::lance_err!($fmt $(, $arg)*))
    };
}

/// Panic with a formatted [`LanceError`], for invariants that cannot be
/// propagated as a `Result`.
#[macro_export]
macro_rules! lance_panic {
    ($variant:ident: $fmt:literal $(, $arg:expr)* $(,)?) => {
        panic!("{}", $crate::lance_err!($variant: $fmt $(, $arg)*))
    };
    ($fmt:literal $(, $arg:expr)* $(,)?) => {
        panic!("{}", $crate::lance_err!($fmt $(, $arg)*))
    };
}

/// Unwrap with a static context message, panicking through the Lance error
/// display on failure.
pub trait LanceExpect<T> {
    /// Unwrap the value, panicking with `msg` and the underlying failure.
    fn lance_expect(self, msg: &str) -> T;
}

impl<T> LanceExpect<T> for Option<T> {
    #[track_caller]
    fn lance_expect(self, msg: &str) -> T {
        self.unwrap_or_else(|| panic!("expected Some: {msg}"))
    }
}

impl<T, E: Into<LanceError>> LanceExpect<T> for Result<T, E> {
    #[track_caller]
    fn lance_expect(self, msg: &str) -> T {
        self.unwrap_or_else(|e| panic!("{msg}: {}", e.into()))
    }
}

/// Unwrap a result whose error converts into [`LanceError`].
pub trait LanceUnwrap<T> {
    /// Unwrap the value, panicking through the Lance error display.
    fn lance_unwrap(self) -> T;
}

impl<T, E: Into<LanceError>> LanceUnwrap<T> for Result<T, E> {
    #[track_caller]
    fn lance_unwrap(self) -> T {
        self.unwrap_or_else(|e| panic!("{}", e.into()))
    }
}
