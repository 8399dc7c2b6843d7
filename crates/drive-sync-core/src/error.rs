//! Error types for Drive sync core.

use thiserror::Error;

/// Errors raised by the pure packet and identifier primitives.
///
/// These are input errors: retrying the same call can never succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A packet hash was not 32 bytes of hex.
    #[error("invalid packet hash: {0}")]
    InvalidHash(String),

    /// A content identifier string could not be parsed.
    #[error("invalid content identifier: {0}")]
    InvalidContentId(String),

    /// The packet holds a value with no canonical encoding.
    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),

    #[error("malformed packet: {0}")]
    MalformedPacket(String),

    /// A block was appended at or below the current tip.
    #[error("block at height {height} does not extend tip at height {tip}")]
    BlockOutOfOrder { tip: u64, height: u64 },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
