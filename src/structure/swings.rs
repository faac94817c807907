//! Swing detection
//!
//! Scans the candle series causally and keeps an alternating chain of
//! confirmed swing highs and lows:
//! - a pivot is confirmed `SWING_WINDOW` candles after it forms
//! - a same-side pivot replaces the previous swing when it is more extreme
//! - a candle committing both sides becomes a `Double` swing
//! - a swing holding for `EXTREMUM_WINDOW` candles is promoted to extremum

use super::candles::Candle;
use super::config::EngineConfig;
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Candles after a pivot needed to confirm it
pub const SWING_WINDOW: usize = 1;

/// Candles a swing must hold before it counts as an extremum
pub const EXTREMUM_WINDOW: usize = 3;

/// Price side of a level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Side {
    High,
    Low,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::High => Side::Low,
            Side::Low => Side::High,
        }
    }

    /// The candle extreme on this side
    pub fn extreme(self, candle: &Candle) -> f64 {
        match self {
            Side::High => candle.high,
            Side::Low => candle.low,
        }
    }

    /// `price` lies strictly beyond `level` on this side
    pub fn beyond(self, price: f64, level: f64) -> bool {
        match self {
            Side::High => price > level,
            Side::Low => price < level,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::High => write!(f, "H"),
            Side::Low => write!(f, "L"),
        }
    }
}

/// Direction of the last confirmed structural break
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Bullish,
    Bearish,
}

impl Trend {
    /// Trend set by a break through a level on `side`
    pub fn from_break(side: Side) -> Self {
        match side {
            Side::High => Trend::Bullish,
            Side::Low => Trend::Bearish,
        }
    }
}

/// Which extremes a swing marks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SwingSide {
    High,
    Low,
    /// One candle confirmed as both a high and a low
    Double,
}

impl SwingSide {
    pub fn has(self, side: Side) -> bool {
        match self {
            SwingSide::Double => true,
            SwingSide::High => side == Side::High,
            SwingSide::Low => side == Side::Low,
        }
    }

    pub fn sides(self) -> &'static [Side] {
        match self {
            SwingSide::High => &[Side::High],
            SwingSide::Low => &[Side::Low],
            SwingSide::Double => &[Side::High, Side::Low],
        }
    }
}

impl From<Side> for SwingSide {
    fn from(side: Side) -> Self {
        match side {
            Side::High => SwingSide::High,
            Side::Low => SwingSide::Low,
        }
    }
}

/// A swing point anchored on one candle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Swing {
    pub side: SwingSide,
    pub index: usize,
    pub time: i64,
    /// Recorded when the swing marks a high, or carries a hidden high pivot
    pub high: Option<f64>,
    /// Recorded when the swing marks a low, or carries a hidden low pivot
    pub low: Option<f64>,
    pub is_extremum: bool,
    /// The swing candle swept the previous same-side swing and closed back
    pub is_ifc: bool,
}

impl Swing {
    pub fn new(candle: &Candle, index: usize, side: SwingSide) -> Self {
        Self {
            side,
            index,
            time: candle.time,
            high: side.has(Side::High).then_some(candle.high),
            low: side.has(Side::Low).then_some(candle.low),
            is_extremum: false,
            is_ifc: false,
        }
    }

    pub fn price(&self, side: Side) -> Option<f64> {
        match side {
            Side::High => self.high,
            Side::Low => self.low,
        }
    }

    /// Add the other side, turning the swing into a `Double`
    fn upgrade(&mut self, candle: &Candle) {
        self.side = SwingSide::Double;
        self.high = Some(candle.high);
        self.low = Some(candle.low);
    }
}

/// Change to the swing chain produced while processing one candle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwingEvent {
    /// `side` was committed at `index`; when `index` already held the other
    /// side it is now a `Double`
    Committed {
        index: usize,
        side: Side,
        /// Same-side swing swept by the candle's wick (IFC)
        ifc_sweep: Option<usize>,
    },
    /// `old` was replaced by the more extreme `new`
    Superseded { old: usize, new: usize },
    /// Swing held long enough to count as an extremum
    Promoted { index: usize },
}

/// Causal swing detector, fed one candle index at a time
pub struct SwingDetector<'a> {
    candles: &'a [Candle],
    reverse_swings: bool,
    show_hidden_swings: bool,
    swings: Vec<Option<Swing>>,
    /// Indices of live swings, alternating sides
    chain: Vec<usize>,
}

impl<'a> SwingDetector<'a> {
    pub fn new(candles: &'a [Candle], config: &EngineConfig) -> Self {
        Self {
            candles,
            reverse_swings: config.reverse_swings,
            show_hidden_swings: config.show_hidden_swings,
            swings: vec![None; candles.len()],
            chain: Vec::new(),
        }
    }

    /// Process candle `i`; every candle before it must have been processed
    pub fn step(&mut self, i: usize) -> Vec<SwingEvent> {
        let mut events = Vec::new();

        if i > SWING_WINDOW {
            let p = i - SWING_WINDOW;
            let order = if self.reverse_swings {
                [Side::Low, Side::High]
            } else {
                [Side::High, Side::Low]
            };
            for side in order {
                if self.is_pivot(p, side) {
                    self.commit(p, side, &mut events);
                }
            }
        }

        if i >= EXTREMUM_WINDOW {
            let p = i - EXTREMUM_WINDOW;
            if self.chain.contains(&p) && self.held(p, i) {
                if let Some(swing) = self.swings[p].as_mut() {
                    swing.is_extremum = true;
                }
                events.push(SwingEvent::Promoted { index: p });
            }
        }

        events
    }

    pub fn swings(&self) -> &[Option<Swing>] {
        &self.swings
    }

    pub fn into_swings(self) -> Vec<Option<Swing>> {
        self.swings
    }

    fn is_pivot(&self, p: usize, side: Side) -> bool {
        let price = side.extreme(&self.candles[p]);
        let left = side.extreme(&self.candles[p - 1]);
        if side.beyond(left, price) {
            return false;
        }
        (p + 1..=p + SWING_WINDOW).all(|j| side.beyond(price, side.extreme(&self.candles[j])))
    }

    /// No candle in `p+1..=i` exceeded the swing on any of its sides
    fn held(&self, p: usize, i: usize) -> bool {
        let Some(swing) = self.swings[p].as_ref() else {
            return false;
        };
        swing.side.sides().iter().any(|&side| {
            let level = side.extreme(&self.candles[p]);
            (p + 1..=i).all(|j| !side.beyond(side.extreme(&self.candles[j]), level))
        })
    }

    /// Most recent live swing (other than `p`) carrying `side`
    fn last_with(&self, side: Side, p: usize) -> Option<usize> {
        self.chain.iter().rev().copied().find(|&q| {
            q != p
                && self.swings[q]
                    .as_ref()
                    .map(|s| s.side.has(side))
                    .unwrap_or(false)
        })
    }

    fn ifc_sweep(&self, p: usize, side: Side) -> Option<usize> {
        let q = self.last_with(side, p)?;
        let candle = &self.candles[p];
        let level = side.extreme(&self.candles[q]);
        (side.beyond(side.extreme(candle), level) && side.beyond(level, candle.close)).then_some(q)
    }

    fn commit(&mut self, p: usize, side: Side, events: &mut Vec<SwingEvent>) {
        let candle = &self.candles[p];
        let ifc_sweep = self.ifc_sweep(p, side);

        if let Some(&last) = self.chain.last() {
            if last == p {
                if let Some(swing) = self.swings[p].as_mut() {
                    swing.upgrade(candle);
                    swing.is_ifc |= ifc_sweep.is_some();
                }
                trace!("swing {} upgraded to double", p);
                events.push(SwingEvent::Committed {
                    index: p,
                    side,
                    ifc_sweep,
                });
                return;
            }

            let same_side = self.swings[last]
                .as_ref()
                .map(|s| s.side == SwingSide::from(side))
                .unwrap_or(false);
            if same_side {
                let last_price = side.extreme(&self.candles[last]);
                if side.beyond(last_price, side.extreme(candle)) {
                    // Weaker than the live swing: pruned
                    if self.show_hidden_swings && self.swings[p].is_none() {
                        self.swings[p] = Some(Swing::new(candle, p, side.into()));
                    }
                    return;
                }

                self.chain.pop();
                if self.show_hidden_swings {
                    if let Some(old) = self.swings[last].as_mut() {
                        old.is_extremum = false;
                    }
                } else {
                    self.swings[last] = None;
                }
                trace!("swing {} superseded by {}", last, p);
                events.push(SwingEvent::Superseded { old: last, new: p });
            }
        }

        let mut swing = Swing::new(candle, p, side.into());
        swing.is_ifc = ifc_sweep.is_some();
        // Keep the price of a hidden pivot pruned on this candle
        if let Some(hidden) = self.swings[p].as_ref() {
            swing.high = swing.high.or(hidden.high);
            swing.low = swing.low.or(hidden.low);
        }
        self.swings[p] = Some(swing);
        self.chain.push(p);
        trace!("swing {}{} committed", side, p);
        events.push(SwingEvent::Committed {
            index: p,
            side,
            ifc_sweep,
        });
    }
}

/// Run the detector alone over a full series
pub fn detect(candles: &[Candle], config: &EngineConfig) -> Vec<Option<Swing>> {
    let mut detector = SwingDetector::new(candles, config);
    for i in 0..candles.len() {
        detector.step(i);
    }
    detector.into_swings()
}
