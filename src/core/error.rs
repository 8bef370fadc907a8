use thiserror::Error;

/// Errors produced by the data container layer.
///
/// All errors are raised synchronously at the offending call. Mutating
/// operations either apply fully or fail before any change is visible.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("precondition failed: {0}")]
    PreconditionFailed(String),

    #[error("index {index} is out of allowed range 0:{len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
}
