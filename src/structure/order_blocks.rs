//! Order-block extraction
//!
//! Turns swing and structure events into points of interest (POIs). Each
//! origin starts a bounded search for an order-block candle `k`: the candle
//! after it moves in the zone direction and the one after that leaves an
//! imbalance gap back to `k`. Found zones are then watched for mitigation.

use super::candles::Candle;
use super::config::EngineConfig;
use super::crosses::{CrossKind, StructureClassifier, StructureEvent};
use super::swings::{Side, SwingDetector, SwingEvent, SwingSide};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Candles after a sweep searched for an order block
pub const OB_SEARCH_LIMIT: usize = 10;

/// Origin of a point of interest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PoiType {
    /// IFC swing sweeping the anchor of an open cross
    IdmIfc,
    /// Order block inside the internal range of a confirmed cross
    ObIdm,
    /// Same as `ObIdm`, the inducement swing being IFC. The sweep is the
    /// inducement candle's own wick, known when the cross confirms, so the
    /// type is fixed at creation
    ObIdmIfc,
    /// IFC swing sweeping plain liquidity
    LqIfc,
    /// IFC swing sweeping an extremum
    ExtLqIfc,
    /// Order block on an extremum candle
    ObExt,
    /// Swing rejecting the level of the last CHoCH
    ChochIfc,
}

/// How a zone is traded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    Limit,
    Market,
}

impl PoiType {
    pub fn trade_order_type(self) -> OrderType {
        match self {
            PoiType::ObIdm | PoiType::ObExt => OrderType::Limit,
            PoiType::IdmIfc
            | PoiType::ObIdmIfc
            | PoiType::LqIfc
            | PoiType::ExtLqIfc
            | PoiType::ChochIfc => OrderType::Market,
        }
    }

    fn is_sweep(self) -> bool {
        matches!(
            self,
            PoiType::IdmIfc | PoiType::LqIfc | PoiType::ExtLqIfc | PoiType::ChochIfc
        )
    }
}

impl std::fmt::Display for PoiType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PoiType::IdmIfc => "IDM_IFC",
            PoiType::ObIdm => "OB_IDM",
            PoiType::ObIdmIfc => "OB_IDM_IFC",
            PoiType::LqIfc => "LQ_IFC",
            PoiType::ExtLqIfc => "EXT_LQ_IFC",
            PoiType::ObExt => "OB_EXT",
            PoiType::ChochIfc => "CHOCH_IFC",
        };
        write!(f, "{}", name)
    }
}

/// Point of interest: an order-block zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poi {
    pub poi_type: PoiType,
    /// `Low` for demand zones, `High` for supply zones
    pub side: Side,
    pub swing_index: usize,
    pub start_index: usize,
    pub last_orderblock_index: usize,
    pub first_imbalance_index: usize,
    pub imbalance_index: usize,
    pub last_imbalance_index: usize,
    /// First candle re-entering the zone
    pub end_index: Option<usize>,
    pub top: f64,
    pub bottom: f64,
    pub is_smt: bool,
    pub can_trade: bool,
    pub take_profit: f64,
}

impl Poi {
    pub fn order_type(&self) -> OrderType {
        self.poi_type.trade_order_type()
    }

    pub fn is_mitigated(&self) -> bool {
        self.end_index.is_some()
    }

    fn touched_by(&self, candle: &Candle) -> bool {
        match self.side {
            Side::Low => candle.low <= self.top,
            Side::High => candle.high >= self.bottom,
        }
    }
}

/// Order-block pattern at `k` for a zone on `side`, if candles up to `k+2` exist
pub fn is_order_block(candles: &[Candle], k: usize, side: Side) -> bool {
    if k + 2 >= candles.len() {
        return false;
    }
    let (base, mover, gap) = (&candles[k], &candles[k + 1], &candles[k + 2]);
    match side {
        Side::Low => mover.is_bullish() && gap.low > base.high,
        Side::High => mover.is_bearish() && gap.high < base.low,
    }
}

#[derive(Debug, Clone)]
struct PendingSearch {
    poi_type: PoiType,
    side: Side,
    swing_index: usize,
    /// Zone never extends back before this candle
    origin: usize,
    next_k: usize,
    last_k: usize,
    /// Swing swept by `swing_index`, for SMT
    swept: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
struct LastChoch {
    from: usize,
    side: Side,
    to: usize,
}

/// Causal POI extractor, fed the events of each candle
pub struct OrderBlockExtractor<'a> {
    candles: &'a [Candle],
    new_smt: bool,
    trade_idm_ifc: bool,
    trade_ob_idm: bool,
    /// Anchors of unconfirmed crosses
    active_from: BTreeSet<usize>,
    extremes: BTreeSet<usize>,
    ifc_swings: BTreeSet<usize>,
    sides: BTreeMap<usize, SwingSide>,
    last_choch: Option<LastChoch>,
    pending: Vec<PendingSearch>,
    /// Claimed `(order-block candle, side)` keys
    seen: BTreeSet<(usize, Side)>,
    pois: Vec<Poi>,
}

impl<'a> OrderBlockExtractor<'a> {
    pub fn new(candles: &'a [Candle], config: &EngineConfig) -> Self {
        Self {
            candles,
            new_smt: config.new_smt,
            trade_idm_ifc: config.trade_idm_ifc,
            trade_ob_idm: config.trade_ob_idm,
            active_from: BTreeSet::new(),
            extremes: BTreeSet::new(),
            ifc_swings: BTreeSet::new(),
            sides: BTreeMap::new(),
            last_choch: None,
            pending: Vec::new(),
            seen: BTreeSet::new(),
            pois: Vec::new(),
        }
    }

    pub fn pois(&self) -> &[Poi] {
        &self.pois
    }

    pub fn into_pois(self) -> Vec<Poi> {
        self.pois
    }

    /// Swings promoted to extremum, by the detector or by a confirmed break
    pub fn extremes(&self) -> &BTreeSet<usize> {
        &self.extremes
    }

    /// Process candle `i`, given the swing and structure events it produced
    pub fn step(&mut self, i: usize, swing_events: &[SwingEvent], structure_events: &[StructureEvent]) {
        self.mitigate(i);

        // The committing swing may sweep the one it replaces, so superseded
        // swings are retired after the sweep is classified
        let mut retired = Vec::new();
        for event in swing_events {
            match *event {
                SwingEvent::Committed {
                    index,
                    side,
                    ifc_sweep,
                } => self.on_committed(index, side, ifc_sweep),
                SwingEvent::Superseded { old, .. } => retired.push(old),
                SwingEvent::Promoted { index } => self.promote(index),
            }
        }
        for old in retired {
            self.extremes.remove(&old);
            self.sides.remove(&old);
            self.ifc_swings.remove(&old);
        }

        for event in structure_events {
            match *event {
                StructureEvent::Opened { slot, .. } => {
                    self.active_from.insert(slot);
                }
                StructureEvent::Swept { .. } => {}
                StructureEvent::Confirmed {
                    slot,
                    side,
                    kind,
                    idm,
                    to,
                } => {
                    self.active_from.remove(&slot);
                    if kind == CrossKind::Choch {
                        self.last_choch = Some(LastChoch {
                            from: slot,
                            side,
                            to,
                        });
                    }
                    self.search_internal_range(side, idm, to);
                }
                StructureEvent::Discarded { slot } => {
                    self.active_from.remove(&slot);
                }
                StructureEvent::ExtremumPromoted { index } => self.promote(index),
            }
        }

        self.advance(i);
    }

    fn on_committed(&mut self, index: usize, side: Side, ifc_sweep: Option<usize>) {
        self.sides
            .entry(index)
            .and_modify(|s| *s = SwingSide::Double)
            .or_insert(SwingSide::from(side));
        if ifc_sweep.is_some() {
            self.ifc_swings.insert(index);
        }

        if let Some(choch) = self.last_choch {
            let candle = &self.candles[index];
            let level = choch.side.extreme(&self.candles[choch.from]);
            let rejected = side == choch.side.opposite()
                && side.beyond(side.extreme(candle), level)
                && !side.beyond(candle.close, level);
            if choch.to < index && rejected {
                self.last_choch = None;
                self.queue_sweep(PoiType::ChochIfc, index, side, choch.from);
                return;
            }
        }

        if let Some(swept) = ifc_sweep {
            let poi_type = if self.active_from.contains(&swept) {
                PoiType::IdmIfc
            } else if self.extremes.contains(&swept) {
                PoiType::ExtLqIfc
            } else {
                PoiType::LqIfc
            };
            self.queue_sweep(poi_type, index, side, swept);
        }
    }

    fn queue_sweep(&mut self, poi_type: PoiType, index: usize, side: Side, swept: usize) {
        self.pending.push(PendingSearch {
            poi_type,
            side,
            swing_index: index,
            origin: index,
            next_k: index,
            last_k: index + OB_SEARCH_LIMIT,
            swept: Some(swept),
        });
    }

    /// Order block between the inducement and the breaking candle
    fn search_internal_range(&mut self, side: Side, idm: usize, to: usize) {
        if to < idm + 2 {
            return;
        }
        let poi_type = if self.ifc_swings.contains(&idm) {
            PoiType::ObIdmIfc
        } else {
            PoiType::ObIdm
        };
        self.pending.push(PendingSearch {
            poi_type,
            side: side.opposite(),
            swing_index: idm,
            origin: idm,
            next_k: idm,
            last_k: to - 2,
            swept: None,
        });
    }

    fn promote(&mut self, index: usize) {
        if !self.extremes.insert(index) {
            return;
        }
        let Some(&swing_side) = self.sides.get(&index) else {
            return;
        };
        for &side in swing_side.sides() {
            self.pending.push(PendingSearch {
                poi_type: PoiType::ObExt,
                side,
                swing_index: index,
                origin: index,
                next_k: index,
                last_k: index,
                swept: None,
            });
        }
    }

    /// Evaluate every pending candidate whose gap candle is available
    fn advance(&mut self, i: usize) {
        let mut pending = std::mem::take(&mut self.pending);
        pending.retain_mut(|search| {
            while search.next_k <= search.last_k && search.next_k + 2 <= i {
                let k = search.next_k;
                search.next_k += 1;
                if is_order_block(self.candles, k, search.side) && !self.seen.contains(&(k, search.side)) {
                    self.create(search, k, i);
                    return false;
                }
            }
            search.next_k <= search.last_k
        });
        self.pending = pending;
    }

    fn create(&mut self, search: &PendingSearch, k: usize, i: usize) {
        let candles = self.candles;
        let side = search.side;
        let opposite_coloured = |c: &Candle| match side {
            Side::Low => c.is_bearish(),
            Side::High => c.is_bullish(),
        };

        let mut start = k;
        if opposite_coloured(&candles[k]) {
            while start > search.origin && opposite_coloured(&candles[start - 1]) {
                start -= 1;
            }
        }

        let zone = &candles[start..=k];
        let top = zone.iter().map(|c| c.high).fold(f64::MIN, f64::max);
        let bottom = zone.iter().map(|c| c.low).fold(f64::MAX, f64::min);
        let reach = &candles[k..=k + 2];
        let take_profit = match side {
            Side::Low => reach.iter().map(|c| c.high).fold(f64::MIN, f64::max),
            Side::High => reach.iter().map(|c| c.low).fold(f64::MAX, f64::min),
        };

        let is_smt = match search.swept {
            Some(swept) if search.poi_type.is_sweep() => self.diverges(side, search.swing_index, swept),
            _ => false,
        };
        let can_trade = match search.poi_type {
            PoiType::IdmIfc | PoiType::ObIdmIfc => self.trade_idm_ifc,
            PoiType::ObIdm => self.trade_ob_idm,
            _ => true,
        };

        let mut poi = Poi {
            poi_type: search.poi_type,
            side,
            swing_index: search.swing_index,
            start_index: start,
            last_orderblock_index: k,
            first_imbalance_index: k + 1,
            imbalance_index: k + 2,
            last_imbalance_index: k + 2,
            end_index: None,
            top,
            bottom,
            is_smt,
            can_trade,
            take_profit,
        };

        // Catch up on candles already past the imbalance
        if let Some(j) = (k + 3..=i).find(|&j| poi.touched_by(&candles[j])) {
            poi.end_index = Some(j);
            poi.can_trade = false;
        }

        debug!(
            "{} {} zone at {} ({}..={}) from swing {}",
            poi.poi_type, side, k, poi.bottom, poi.top, poi.swing_index
        );
        self.seen.insert((k, side));
        self.pois.push(poi);
    }

    /// Sweeping candle `p` fails to confirm the new extreme of `swept`
    fn diverges(&self, side: Side, p: usize, swept: usize) -> bool {
        let (sweeper, target) = (&self.candles[p], &self.candles[swept]);
        match (side, self.new_smt) {
            (Side::Low, false) => sweeper.close > target.close,
            (Side::Low, true) => sweeper.body_low() > target.body_low(),
            (Side::High, false) => sweeper.close < target.close,
            (Side::High, true) => sweeper.body_high() < target.body_high(),
        }
    }

    fn mitigate(&mut self, i: usize) {
        let candle = self.candles[i];
        for poi in self.pois.iter_mut() {
            if poi.end_index.is_none() && i > poi.imbalance_index && poi.touched_by(&candle) {
                debug!("{} zone at {} mitigated on {}", poi.poi_type, poi.last_orderblock_index, i);
                poi.end_index = Some(i);
                poi.can_trade = false;
            }
        }
    }
}

/// Run all three stages over a full series and return the POIs
pub fn extract(candles: &[Candle], config: &EngineConfig) -> Vec<Poi> {
    let mut detector = SwingDetector::new(candles, config);
    let mut classifier = StructureClassifier::new(candles, config);
    let mut extractor = OrderBlockExtractor::new(candles, config);
    for i in 0..candles.len() {
        let swing_events = detector.step(i);
        let structure_events = classifier.step(i, &swing_events);
        extractor.step(i, &swing_events, &structure_events);
    }
    extractor.into_pois()
}
