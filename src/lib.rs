// Library crate - market structure detection over OHLCV candles

pub mod error;
pub mod loader;
pub mod structure;

// Re-export commonly used types
pub use error::EngineError;
pub use structure::{analyze, Candle, EngineConfig, StateManager, StructureSnapshot};
