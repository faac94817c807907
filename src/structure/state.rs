//! Engine orchestrator
//!
//! Drives the three stages over a candle series:
//! 1. SwingDetector - swing chain and extremum promotion
//! 2. StructureClassifier - IDM/BOS/CHoCH crosses
//! 3. OrderBlockExtractor - order-block zones and their mitigation
//!
//! In single-pass mode the stages are interleaved candle by candle. Legacy
//! mode runs each stage over the whole series before starting the next one.
//! Both feed the stages the same per-candle events, so the output is the same.

use super::candles::{validate_candles, Candle};
use super::config::EngineConfig;
use super::crosses::{Cross, StructureClassifier, StructureEvent};
use super::order_blocks::{OrderBlockExtractor, Poi};
use super::swings::{Swing, SwingDetector, SwingEvent};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Serializable engine output
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StructureSnapshot {
    /// One slot per candle
    pub swings: Vec<Option<Swing>>,
    /// One slot per candle, keyed by the anchor swing index
    pub boses: Vec<Option<Cross>>,
    pub pois: Vec<Poi>,
}

impl StructureSnapshot {
    pub fn swing_count(&self) -> usize {
        self.swings.iter().flatten().count()
    }

    pub fn cross_count(&self) -> usize {
        self.boses.iter().flatten().count()
    }

    pub fn confirmed(&self) -> impl Iterator<Item = &Cross> {
        self.boses.iter().flatten().filter(|c| c.is_confirmed)
    }

    pub fn open_pois(&self) -> impl Iterator<Item = &Poi> {
        self.pois.iter().filter(|p| !p.is_mitigated())
    }
}

/// Owns the results for one candle series
pub struct StateManager<'a> {
    candles: &'a [Candle],
    config: EngineConfig,
    swings: Vec<Option<Swing>>,
    boses: Vec<Option<Cross>>,
    pois: Vec<Poi>,
}

impl<'a> StateManager<'a> {
    /// Validates the series; nothing is computed until [`Self::calculate`]
    pub fn new(candles: &'a [Candle], config: EngineConfig) -> Result<Self> {
        validate_candles(candles)?;
        Ok(Self {
            candles,
            config,
            swings: vec![None; candles.len()],
            boses: vec![None; candles.len()],
            pois: Vec::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn candles(&self) -> &'a [Candle] {
        self.candles
    }

    /// Recompute everything from scratch
    pub fn calculate(&mut self) {
        let (swings, boses, extractor) = if self.config.one_iteration {
            self.run_single_pass()
        } else {
            self.run_legacy()
        };

        let extremes = extractor.extremes();
        self.swings = swings
            .into_iter()
            .map(|slot| {
                slot.map(|mut swing| {
                    swing.is_extremum = extremes.contains(&swing.index);
                    swing.is_ifc &= self.config.show_ifc;
                    swing
                })
            })
            .collect();
        self.boses = boses;
        self.pois = extractor.into_pois();

        debug!(
            "{} candles: {} swings, {} crosses, {} pois",
            self.candles.len(),
            self.swings.iter().flatten().count(),
            self.boses.iter().flatten().count(),
            self.pois.len()
        );
    }

    fn run_single_pass(&self) -> (Vec<Option<Swing>>, Vec<Option<Cross>>, OrderBlockExtractor<'a>) {
        let mut detector = SwingDetector::new(self.candles, &self.config);
        let mut classifier = StructureClassifier::new(self.candles, &self.config);
        let mut extractor = OrderBlockExtractor::new(self.candles, &self.config);

        for i in 0..self.candles.len() {
            let swing_events = detector.step(i);
            let structure_events = classifier.step(i, &swing_events);
            extractor.step(i, &swing_events, &structure_events);
        }

        (detector.into_swings(), classifier.into_boses(), extractor)
    }

    fn run_legacy(&self) -> (Vec<Option<Swing>>, Vec<Option<Cross>>, OrderBlockExtractor<'a>) {
        let n = self.candles.len();

        let mut detector = SwingDetector::new(self.candles, &self.config);
        let swing_events: Vec<Vec<SwingEvent>> = (0..n).map(|i| detector.step(i)).collect();

        let mut classifier = StructureClassifier::new(self.candles, &self.config);
        let structure_events: Vec<Vec<StructureEvent>> = (0..n)
            .map(|i| classifier.step(i, &swing_events[i]))
            .collect();

        let mut extractor = OrderBlockExtractor::new(self.candles, &self.config);
        for i in 0..n {
            extractor.step(i, &swing_events[i], &structure_events[i]);
        }

        (detector.into_swings(), classifier.into_boses(), extractor)
    }

    pub fn swings(&self) -> &[Option<Swing>] {
        &self.swings
    }

    pub fn boses(&self) -> &[Option<Cross>] {
        &self.boses
    }

    pub fn pois(&self) -> &[Poi] {
        &self.pois
    }

    pub fn snapshot(&self) -> StructureSnapshot {
        StructureSnapshot {
            swings: self.swings.clone(),
            boses: self.boses.clone(),
            pois: self.pois.clone(),
        }
    }
}

/// Validate, calculate and snapshot in one call
pub fn analyze(candles: &[Candle], config: EngineConfig) -> Result<StructureSnapshot> {
    let mut manager = StateManager::new(candles, config)?;
    manager.calculate();
    Ok(manager.snapshot())
}
