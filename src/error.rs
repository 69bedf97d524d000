use thiserror::Error;

/// Precondition failures on controller operations. Callers only pass indices
/// taken from the rendered list, so these indicate a bug rather than a
/// recoverable condition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("track index {index} out of range for library of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("track {0:?} is already being removed")]
    RemovalPending(String),
}

/// Messages rejected at the UI/backend boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("unsupported protocol version {found}, expected {expected}")]
    Version { found: u16, expected: u16 },

    #[error("volume {0} outside 0..=100")]
    Volume(u8),

    #[error("invalid file name {0:?}")]
    FileName(String),

    #[error("empty download link")]
    EmptyLink,

    #[error("empty path in {0}")]
    EmptyPath(&'static str),

    #[error("malformed message: {0}")]
    Malformed(String),
}
