//! Parse errors for the quad-double scalar.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QdParseError {
    #[error("empty numeric string")]
    Empty,

    #[error("invalid character {ch:?} at position {pos}")]
    InvalidChar { ch: char, pos: usize },

    #[error("decimal exponent out of range")]
    ExponentOutOfRange,
}
