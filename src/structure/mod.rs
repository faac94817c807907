//! Market structure engine
//!
//! Derives, from an ordered candle series:
//! - swing highs and lows (`swings`)
//! - IDM / BOS / CHoCH crosses (`crosses`)
//! - order-block points of interest (`order_blocks`)
//!
//! [`StateManager`] runs the stages and owns the results.

pub mod candles;
pub mod config;
pub mod crosses;
pub mod order_blocks;
pub mod state;
pub mod swings;

#[cfg(test)]
pub mod fixtures;

pub use candles::{validate_candles, Candle};
pub use config::EngineConfig;
pub use crosses::{classify, Cross, CrossKind, StructureClassifier, StructureEvent};
pub use order_blocks::{extract, OrderBlockExtractor, OrderType, Poi, PoiType, OB_SEARCH_LIMIT};
pub use state::{analyze, StateManager, StructureSnapshot};
pub use swings::{detect, Side, Swing, SwingDetector, SwingEvent, SwingSide, Trend, EXTREMUM_WINDOW, SWING_WINDOW};
