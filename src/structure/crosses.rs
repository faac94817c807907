//! Structure classification: IDM, BOS and CHoCH crosses
//!
//! Every swing that is followed by an opposite-side pullback becomes the
//! anchor of a cross. The cross stays an IDM marker until a candle trades
//! through the anchor level:
//! 1. A wick through without a close beyond sweeps liquidity ("Fake" break)
//! 2. A close beyond (or a wick with `with_move`) confirms the break
//! 3. When several crosses confirm on one candle only the earliest anchor survives

use super::candles::Candle;
use super::config::EngineConfig;
use super::swings::{Side, SwingDetector, SwingEvent, SwingSide, Trend};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Structural role of a cross
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CrossKind {
    /// Internal dealing range marker, or an inducement taken inside the trend
    Idm,
    /// Break of structure in the trend direction
    Bos,
    /// Change of character against the trend
    Choch,
}

impl std::fmt::Display for CrossKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CrossKind::Idm => write!(f, "IDM"),
            CrossKind::Bos => write!(f, "BOS"),
            CrossKind::Choch => write!(f, "CHoCH"),
        }
    }
}

/// Directional move from an anchor swing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cross {
    /// Side of the anchor level being broken
    pub side: Side,
    pub kind: CrossKind,
    /// Anchor swing index
    pub from: usize,
    /// Pullback swing that opened the internal range
    pub idm: usize,
    /// Candle that swept or confirmed the level
    pub to: Option<usize>,
    /// Opposite extreme between `from` and the confirming candle
    pub extremum: Option<usize>,
    pub is_swiped_liquidity: bool,
    pub is_confirmed: bool,
}

impl Cross {
    pub fn open(side: Side, from: usize, idm: usize) -> Self {
        Self {
            side,
            kind: CrossKind::Idm,
            from,
            idm,
            to: None,
            extremum: None,
            is_swiped_liquidity: false,
            is_confirmed: false,
        }
    }

    /// Level that has to be broken
    pub fn level(&self, candles: &[Candle]) -> f64 {
        self.side.extreme(&candles[self.from])
    }

    /// Swept but never confirmed
    pub fn is_fake(&self) -> bool {
        self.is_swiped_liquidity && !self.is_confirmed
    }

    /// Candle used to place the label, midway between `from` and `to`
    pub fn text_index(&self) -> usize {
        match self.to {
            Some(to) => self.from + (to - self.from) / 2,
            None => self.from,
        }
    }

    /// Candles spanned by the cross, taken from the series the caller supplies
    pub fn candles<'a>(&self, candles: &'a [Candle]) -> &'a [Candle] {
        let end = self.to.unwrap_or(self.from).min(candles.len().saturating_sub(1));
        if candles.is_empty() || self.from > end {
            return &[];
        }
        &candles[self.from..=end]
    }

    /// Chart label, e.g. `HBOS`, `Fake LCHoCH`
    pub fn label(&self) -> String {
        let prefix = if self.is_fake() { "Fake " } else { "" };
        format!("{}{}{}", prefix, self.side, self.kind)
    }
}

/// Change to the cross set produced while processing one candle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StructureEvent {
    Opened {
        slot: usize,
        side: Side,
    },
    Swept {
        slot: usize,
    },
    Confirmed {
        slot: usize,
        side: Side,
        kind: CrossKind,
        idm: usize,
        to: usize,
    },
    /// Lost the same-candle dedup against an earlier anchor
    Discarded {
        slot: usize,
    },
    /// Extremum of a confirmed BOS/CHoCH
    ExtremumPromoted {
        index: usize,
    },
}

/// Causal classifier, fed the swing events of each candle
pub struct StructureClassifier<'a> {
    candles: &'a [Candle],
    with_move: bool,
    by_trend: bool,
    show_fake: bool,
    /// Live swings as seen through the swing events
    chain: Vec<(usize, SwingSide)>,
    boses: Vec<Option<Cross>>,
    /// Anchors that already opened a cross
    anchored: Vec<bool>,
    /// Unconfirmed crosses, ascending by anchor
    active: Vec<usize>,
    trend: Option<Trend>,
    /// Extremum of the last BOS/CHoCH
    protected: Option<usize>,
}

impl<'a> StructureClassifier<'a> {
    pub fn new(candles: &'a [Candle], config: &EngineConfig) -> Self {
        Self {
            candles,
            with_move: config.with_move,
            by_trend: config.by_trend,
            show_fake: config.show_fake,
            chain: Vec::new(),
            boses: vec![None; candles.len()],
            anchored: vec![false; candles.len()],
            active: Vec::new(),
            trend: None,
            protected: None,
        }
    }

    pub fn trend(&self) -> Option<Trend> {
        self.trend
    }

    pub fn boses(&self) -> &[Option<Cross>] {
        &self.boses
    }

    /// Process candle `i` after its swing events
    pub fn step(&mut self, i: usize, swing_events: &[SwingEvent]) -> Vec<StructureEvent> {
        let mut events = Vec::new();

        for event in swing_events {
            match *event {
                SwingEvent::Superseded { old, new } => self.supersede(old, new),
                SwingEvent::Committed { index, side, .. } => {
                    self.on_committed(i, index, side, &mut events)
                }
                SwingEvent::Promoted { .. } => {}
            }
        }

        self.check_breaks(i, &mut events);
        events
    }

    /// Final cross slots, applying the fake filter
    pub fn into_boses(self) -> Vec<Option<Cross>> {
        let show_fake = self.show_fake;
        self.boses
            .into_iter()
            .map(|slot| slot.filter(|cross| show_fake || !cross.is_fake()))
            .collect()
    }

    fn supersede(&mut self, old: usize, new: usize) {
        self.chain.retain(|&(index, _)| index != old);
        for &slot in &self.active {
            if let Some(cross) = self.boses[slot].as_mut() {
                if cross.idm == old {
                    cross.idm = new;
                }
            }
        }
    }

    fn on_committed(&mut self, i: usize, index: usize, side: Side, events: &mut Vec<StructureEvent>) {
        if let Some(last) = self.chain.last_mut() {
            if last.0 == index {
                last.1 = SwingSide::Double;
                return;
            }
        }

        let committed = SwingSide::from(side);
        if let Some(&(prev, prev_side)) = self.chain.last() {
            for &anchor_side in prev_side.sides() {
                if committed.has(anchor_side.opposite()) {
                    self.open_cross(i, prev, anchor_side, index, events);
                }
            }
        }
        self.chain.push((index, committed));
    }

    fn open_cross(
        &mut self,
        i: usize,
        from: usize,
        side: Side,
        idm: usize,
        events: &mut Vec<StructureEvent>,
    ) {
        if self.anchored[from] || self.boses[from].is_some() {
            return;
        }

        // Level already traded through before the pullback confirmed
        let level = side.extreme(&self.candles[from]);
        if (from + 1..i).any(|j| side.beyond(side.extreme(&self.candles[j]), level)) {
            self.anchored[from] = true;
            return;
        }

        self.anchored[from] = true;
        self.boses[from] = Some(Cross::open(side, from, idm));
        self.active.push(from);
        events.push(StructureEvent::Opened { slot: from, side });
    }

    fn check_breaks(&mut self, i: usize, events: &mut Vec<StructureEvent>) {
        let candle = self.candles[i];
        let mut candidates = Vec::new();

        for &slot in &self.active {
            let Some(cross) = self.boses[slot].as_ref() else {
                continue;
            };
            let level = cross.level(self.candles);
            let wick_beyond = cross.side.beyond(cross.side.extreme(&candle), level);
            let close_beyond = cross.side.beyond(candle.close, level);

            if close_beyond || (self.with_move && wick_beyond) {
                candidates.push(slot);
            } else if wick_beyond && !cross.is_swiped_liquidity {
                let kind = self.role(cross.side, cross.from);
                if let Some(cross) = self.boses[slot].as_mut() {
                    cross.kind = kind;
                    cross.is_swiped_liquidity = true;
                    cross.to = Some(i);
                }
                events.push(StructureEvent::Swept { slot });
            }
        }

        candidates.sort_unstable();
        let Some((&survivor, rest)) = candidates.split_first() else {
            return;
        };

        for &slot in rest {
            debug!("cross from {} discarded, {} confirms on candle {}", slot, survivor, i);
            self.boses[slot] = None;
            events.push(StructureEvent::Discarded { slot });
        }
        self.active.retain(|slot| !candidates.contains(slot));
        self.confirm(i, survivor, events);
    }

    fn confirm(&mut self, i: usize, slot: usize, events: &mut Vec<StructureEvent>) {
        let candle = self.candles[i];
        let Some(cross) = self.boses[slot].as_ref() else {
            return;
        };
        let side = cross.side;
        let idm = cross.idm;
        let kind = self.role(side, cross.from);
        let wick_only = !side.beyond(candle.close, cross.level(self.candles));
        let extremum = self.find_extremum(side, slot, i);

        if let Some(cross) = self.boses[slot].as_mut() {
            cross.kind = kind;
            cross.is_confirmed = true;
            cross.is_swiped_liquidity |= wick_only;
            cross.to = Some(i);
            cross.extremum = extremum;
        }
        debug!("{}{} from {} confirmed on candle {}", side, kind, slot, i);

        events.push(StructureEvent::Confirmed {
            slot,
            side,
            kind,
            idm,
            to: i,
        });

        if kind != CrossKind::Idm {
            self.trend = Some(Trend::from_break(side));
            self.protected = extremum;
            if let Some(index) = extremum {
                events.push(StructureEvent::ExtremumPromoted { index });
            }
        }
    }

    /// Role of a break through a `side` level anchored at `from`
    fn role(&self, side: Side, from: usize) -> CrossKind {
        match self.trend {
            None => CrossKind::Bos,
            Some(trend) if trend == Trend::from_break(side) => CrossKind::Bos,
            Some(_) => {
                if self.by_trend && !self.reaches_protected(side, from) {
                    CrossKind::Idm
                } else {
                    CrossKind::Choch
                }
            }
        }
    }

    fn reaches_protected(&self, side: Side, from: usize) -> bool {
        let Some(protected) = self.protected else {
            return true;
        };
        let level = side.extreme(&self.candles[from]);
        let protected_level = side.extreme(&self.candles[protected]);
        !side.beyond(protected_level, level)
    }

    /// Most extreme opposite swing in `(from, i]`, latest on ties
    fn find_extremum(&self, side: Side, from: usize, i: usize) -> Option<usize> {
        let opposite = side.opposite();
        let mut best: Option<usize> = None;
        for &(index, swing_side) in &self.chain {
            if index <= from || index > i || !swing_side.has(opposite) {
                continue;
            }
            let price = opposite.extreme(&self.candles[index]);
            match best {
                Some(b) if opposite.beyond(opposite.extreme(&self.candles[b]), price) => {}
                _ => best = Some(index),
            }
        }
        best
    }
}

/// Run the detector and classifier over a full series
pub fn classify(candles: &[Candle], config: &EngineConfig) -> Vec<Option<Cross>> {
    let mut detector = SwingDetector::new(candles, config);
    let mut classifier = StructureClassifier::new(candles, config);
    for i in 0..candles.len() {
        let swing_events = detector.step(i);
        classifier.step(i, &swing_events);
    }
    classifier.into_boses()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::fixtures;

    #[test]
    fn test_scenario_a_idm_promoted_to_bos() {
        let candles = fixtures::scenario_a();
        let mut detector = SwingDetector::new(&candles, &EngineConfig::default());
        let mut classifier = StructureClassifier::new(&candles, &EngineConfig::default());

        for i in 0..candles.len() {
            let swing_events = detector.step(i);
            classifier.step(i, &swing_events);

            let cross = classifier.boses()[1].as_ref();
            match i {
                0..=3 => assert!(cross.is_none()),
                4 => assert_eq!(cross.unwrap().kind, CrossKind::Idm),
                5 | 6 => {
                    // Candle 5 only wicks through 104.32
                    let cross = cross.unwrap();
                    assert_eq!(cross.kind, CrossKind::Bos);
                    assert!(cross.is_fake());
                    assert_eq!(cross.to, Some(5));
                }
                _ => {}
            }
        }

        let boses = classifier.into_boses();
        assert_eq!(boses.len(), candles.len());
        let cross = boses[1].as_ref().unwrap();
        assert_eq!(cross.side, Side::High);
        assert_eq!(cross.kind, CrossKind::Bos);
        assert_eq!(cross.from, 1);
        assert_eq!(cross.idm, 3);
        assert!(cross.is_confirmed);
        assert!(cross.is_swiped_liquidity);
        assert_eq!(cross.to, Some(7));
        assert_eq!(cross.extremum, Some(3));
        assert_eq!(cross.text_index(), 4);
        assert_eq!(cross.candles(&candles).len(), 7);
    }

    #[test]
    fn test_scenario_b_same_candle_dedup() {
        let candles = fixtures::scenario_b();
        let boses = classify(&candles, &EngineConfig::default());

        let first = boses[2].as_ref().unwrap();
        assert_eq!((first.side, first.kind, first.to), (Side::Low, CrossKind::Bos, Some(5)));
        let second = boses[6].as_ref().unwrap();
        assert_eq!((second.side, second.kind, second.to), (Side::Low, CrossKind::Bos, Some(8)));

        // Highs at 1, 4 and 7 are all closed through by candle 11
        let choch = boses[1].as_ref().unwrap();
        assert_eq!(choch.kind, CrossKind::Choch);
        assert!(choch.is_confirmed);
        assert_eq!(choch.to, Some(11));
        assert_eq!(choch.extremum, Some(8));
        assert!(boses[4].is_none());
        assert!(boses[7].is_none());

        let confirmed_on_11 = boses
            .iter()
            .flatten()
            .filter(|c| c.is_confirmed && c.to == Some(11))
            .count();
        assert_eq!(confirmed_on_11, 1);
    }

    #[test]
    fn test_scenario_c_fake_bos_next_to_choch() {
        let candles = fixtures::scenario_c();
        let boses = classify(&candles, &EngineConfig::default());

        let bos = boses[1].as_ref().unwrap();
        assert_eq!((bos.kind, bos.to), (CrossKind::Bos, Some(4)));

        let choch = boses[2].as_ref().unwrap();
        assert_eq!(choch.label(), "LCHoCH");
        assert!(choch.is_confirmed);
        assert_eq!(choch.to, Some(8));
        assert_eq!(choch.extremum, Some(4));

        let fake = boses[8].as_ref().unwrap();
        assert_eq!(fake.label(), "Fake LBOS");
        assert!(!fake.is_confirmed);
        assert_eq!(fake.to, Some(11));
        assert_eq!(fake.idm, 10);

        let idm = boses[10].as_ref().unwrap();
        assert_eq!(idm.kind, CrossKind::Idm);
        assert!(!idm.is_confirmed);
        assert!(!idm.is_swiped_liquidity);

        // Pullback low at 6 was superseded by the low at 8
        let marker = boses[4].as_ref().unwrap();
        assert_eq!((marker.kind, marker.idm), (CrossKind::Idm, 8));
    }

    #[test]
    fn test_hide_fake_drops_swept_crosses() {
        let candles = fixtures::scenario_c();
        let config = EngineConfig {
            show_fake: false,
            ..Default::default()
        };
        let boses = classify(&candles, &config);
        assert!(boses[8].is_none());
        assert!(boses[2].is_some());
        assert!(boses[10].is_some());
    }

    #[test]
    fn test_with_move_confirms_on_wick() {
        let candles = fixtures::scenario_a();
        let config = EngineConfig {
            with_move: true,
            ..Default::default()
        };
        let boses = classify(&candles, &config);
        let cross = boses[1].as_ref().unwrap();
        assert!(cross.is_confirmed);
        assert!(cross.is_swiped_liquidity);
        assert_eq!(cross.to, Some(5));
    }

    #[test]
    fn test_by_trend_keeps_inducement_inside_trend() {
        let candles = fixtures::scenario_b_lower_high();

        let boses = classify(&candles, &EngineConfig::default());
        let cross = boses[10].as_ref().unwrap();
        assert_eq!((cross.kind, cross.to), (CrossKind::Choch, Some(13)));

        let config = EngineConfig {
            by_trend: true,
            ..Default::default()
        };
        let boses = classify(&candles, &config);
        let cross = boses[10].as_ref().unwrap();
        assert_eq!(cross.kind, CrossKind::Idm);
        assert!(cross.is_confirmed);
        assert_eq!(cross.to, Some(13));
    }

    #[test]
    fn test_unconfirmed_cross_helpers() {
        let cross = Cross::open(Side::Low, 3, 5);
        assert_eq!(cross.text_index(), 3);
        assert_eq!(cross.label(), "LIDM");
        assert!(!cross.is_fake());
        assert!(cross.candles(&[]).is_empty());
    }
}
