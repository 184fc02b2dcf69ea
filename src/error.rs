//! Crate-wide error type.
//!
//! Every fallible constructor, reader, writer and solver in `nibrary`
//! returns a `Result<T, NibrError>`. Readers/writers/constructors never
//! partially populate their target: on error the caller gets nothing, not
//! a half-built value.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, NibrError>;

/// The error kinds surfaced by the geometry/image core.
#[derive(Error, Debug)]
pub enum NibrError {
    /// Wrong dimensions, a non-invertible affine, an unsupported enum
    /// value, or mismatched field sizes.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Missing file, unsupported extension, bad magic, truncated stream,
    /// or an unsupported on-disk datatype.
    #[error("file error: {0}")]
    FileError(String),

    /// A solver did not converge, a matrix was singular, or a NaN
    /// appeared in a geometry cache that must not contain one.
    #[error("numeric failure: {0}")]
    NumericFailure(String),

    /// A query fell outside the image's sampling support or past the end
    /// of a reader stream.
    #[error("out of range: {0}")]
    OutOfRange(String),

    /// An impossible precondition was violated. Only ever raised from
    /// `debug_assert!`-guarded paths in debug builds; release builds treat
    /// the condition as already upheld by the caller.
    #[error("fatal precondition violation: {0}")]
    Fatal(String),

    /// Propagated I/O failure from an underlying reader/writer.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
