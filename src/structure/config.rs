//! Configuration for the structure engine

use serde::{Deserialize, Serialize};

/// Named switches altering detection behaviour.
///
/// Keys follow the names used by the charting layer, so a config bag saved by
/// the UI deserializes directly. Missing keys fall back to [`Default`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Use intrabar wicks, not just closes, to confirm breaks
    #[serde(rename = "withMove")]
    pub with_move: bool,

    /// Keep pruned sub-pivots in the swing output
    #[serde(rename = "showHiddenSwings")]
    pub show_hidden_swings: bool,

    /// Compare body edges instead of closes for SMT divergence
    #[serde(rename = "newSMT")]
    pub new_smt: bool,

    /// Surface the IFC flag on swings
    #[serde(rename = "showIFC")]
    pub show_ifc: bool,

    /// Counter-trend breaks must reach the protected extremum to count as CHoCH
    #[serde(rename = "byTrend")]
    pub by_trend: bool,

    /// Keep swept but unconfirmed crosses ("Fake BOS/CHoCH")
    #[serde(rename = "showFake")]
    pub show_fake: bool,

    /// Single forward pass; `false` runs the stages one after another
    #[serde(rename = "oneIteration")]
    pub one_iteration: bool,

    /// Allow trading IDM_IFC and OB_IDM_IFC zones
    #[serde(rename = "tradeIDMIFC")]
    pub trade_idm_ifc: bool,

    /// Allow trading OB_IDM zones
    #[serde(rename = "tradeOBIDM")]
    pub trade_ob_idm: bool,

    /// Evaluate low pivots before high pivots
    #[serde(rename = "reversSwings")]
    pub reverse_swings: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            with_move: false,
            show_hidden_swings: false,
            new_smt: false,
            show_ifc: true,
            by_trend: false,
            show_fake: true,
            one_iteration: true,
            trade_idm_ifc: true,
            trade_ob_idm: true,
            reverse_swings: false,
        }
    }
}

impl EngineConfig {
    /// Trend-filtered structure, confirmed breaks only, no passive IDM zones
    pub fn conservative() -> Self {
        Self {
            by_trend: true,
            show_fake: false,
            trade_ob_idm: false,
            ..Default::default()
        }
    }

    /// Parse a config bag, filling absent keys from the defaults
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
