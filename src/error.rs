//! Errors raised at the engine boundary

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Input rejected before any detection runs
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("candle {index}: {field} is not finite ({value})")]
    NonFinite {
        index: usize,
        field: &'static str,
        value: f64,
    },

    #[error("candle {index}: high {high} is below low {low}")]
    InvertedRange { index: usize, high: f64, low: f64 },

    #[error("candle {index}: open/close outside the high-low range")]
    BodyOutsideRange { index: usize },

    #[error("candle {index}: time {time} does not follow previous time {previous}")]
    NonMonotonicTime {
        index: usize,
        time: i64,
        previous: i64,
    },
}
