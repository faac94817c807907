//! Candle series input and boundary validation

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};

/// One OHLCV bar, `time` in unix seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
    pub time: i64,
}

impl Candle {
    pub fn new(open: f64, high: f64, low: f64, close: f64, volume: f64, time: i64) -> Self {
        Self {
            open,
            high,
            low,
            close,
            volume,
            time,
        }
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// Upper edge of the body
    pub fn body_high(&self) -> f64 {
        self.open.max(self.close)
    }

    /// Lower edge of the body
    pub fn body_low(&self) -> f64 {
        self.open.min(self.close)
    }

    fn validate(&self, index: usize) -> Result<()> {
        let fields = [
            ("open", self.open),
            ("high", self.high),
            ("low", self.low),
            ("close", self.close),
            ("volume", self.volume),
        ];
        for (field, value) in fields {
            if !value.is_finite() {
                return Err(EngineError::NonFinite {
                    index,
                    field,
                    value,
                });
            }
        }

        if self.high < self.low {
            return Err(EngineError::InvertedRange {
                index,
                high: self.high,
                low: self.low,
            });
        }

        if self.body_high() > self.high || self.body_low() < self.low {
            return Err(EngineError::BodyOutsideRange { index });
        }

        Ok(())
    }
}

/// Reject malformed candles and out-of-order timestamps
pub fn validate_candles(candles: &[Candle]) -> Result<()> {
    let mut previous: Option<i64> = None;

    for (index, candle) in candles.iter().enumerate() {
        candle.validate(index)?;

        if let Some(previous) = previous {
            if candle.time <= previous {
                return Err(EngineError::NonMonotonicTime {
                    index,
                    time: candle.time,
                    previous,
                });
            }
        }
        previous = Some(candle.time);
    }

    Ok(())
}
