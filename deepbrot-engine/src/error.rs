//! Engine error types.

use deepbrot_core::QdParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no board supports zoom {zoom:.3e} with exponent {exponent}")]
    BoardUnsupported { zoom: f64, exponent: u32 },

    #[error("reference orbit exhausted at iteration {0}")]
    ReferenceOrbitExhausted(u32),

    #[error("numeric parse error: {0}")]
    Parse(#[from] QdParseError),

    #[error("compute backend fault: {0}")]
    Backend(String),
}
