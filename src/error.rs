use thiserror::Error;

/// Filter and preintegration error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("IIR channel count {requested} exceeds maximum of {max}")]
    TooManyChannels { requested: usize, max: usize },

    #[error("Invalid filter configuration: {0}")]
    InvalidConfig(String),

    #[error("Input block of {len} samples does not match {frames} frames x {channels} channels")]
    BlockShape {
        len: usize,
        frames: usize,
        channels: usize,
    },

    #[error("Slice length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Cannot convert with a zero time interval")]
    ZeroInterval,

    #[error("Integration needs at least one sub-step, got {0}")]
    InvalidSubsteps(u32),
}

/// Result type for filter operations
pub type FilterResult<T> = Result<T, FilterError>;
