use thiserror::Error;

/// Result type for detection and signal-conditioning operations.
pub type Result<T> = std::result::Result<T, DetectError>;

/// Errors raised by the detectors and the conditioning stages.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DetectError {
    /// A parameter is out of range or names an unknown strategy/detector.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Edge padding to a multiple of `2^level` would exceed the search bound.
    #[error(
        "cannot pad {len} samples to a multiple of {multiple} within {limit} samples of padding"
    )]
    InsufficientPadding {
        len: usize,
        multiple: usize,
        limit: usize,
    },

    /// Input is empty, constant, or a normalization divisor is zero.
    #[error("degenerate signal: {0}")]
    DegenerateSignal(String),
}

impl DetectError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfiguration(msg.into())
    }

    pub(crate) fn degenerate(msg: impl Into<String>) -> Self {
        Self::DegenerateSignal(msg.into())
    }
}
