//! Hand-built candle series shared by the unit tests

use super::candles::Candle;

const START_TIME: i64 = 1_700_000_000;

/// One-minute candles from `(open, high, low, close)` tuples
pub fn series(bars: &[(f64, f64, f64, f64)]) -> Vec<Candle> {
    bars.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| {
            Candle::new(open, high, low, close, 100.0 + i as f64, START_TIME + 60 * i as i64)
        })
        .collect()
}

/// High at 1, low at 3, IFC sweep of the high at 5, close through it at 7
pub fn scenario_a() -> Vec<Candle> {
    series(&[
        (104.00, 104.10, 103.95, 104.05),
        (104.05, 104.32, 104.00, 104.20),
        (104.20, 104.25, 104.05, 104.10),
        (104.10, 104.15, 103.90, 104.00),
        (104.00, 104.28, 103.98, 104.25),
        (104.25, 104.39, 104.18, 104.28),
        (104.28, 104.30, 104.10, 104.15),
        (104.15, 104.36, 104.12, 104.35),
    ])
}

/// Downtrend with three lower highs, all closed through by candle 11
pub fn scenario_b() -> Vec<Candle> {
    series(&[
        (100.0, 101.0, 99.5, 100.5),
        (100.5, 102.0, 100.0, 101.5),
        (101.5, 101.8, 99.0, 99.5),
        (99.5, 100.5, 99.2, 100.2),
        (100.2, 101.0, 99.6, 100.8),
        (100.8, 100.9, 98.0, 98.3),
        (98.3, 99.0, 97.5, 97.8),
        (97.8, 99.5, 97.7, 99.3),
        (99.3, 99.4, 96.8, 97.0),
        (97.0, 98.2, 96.9, 98.0),
        (98.0, 98.5, 97.6, 98.3),
        (98.3, 103.0, 98.1, 102.8),
    ])
}

/// Scenario B up to candle 9, then a lower high at 10 closed through at 13
/// without reaching the protected high at 7
pub fn scenario_b_lower_high() -> Vec<Candle> {
    let mut candles = scenario_b();
    candles.truncate(10);
    let tail = series(&[
        (98.0, 98.9, 97.6, 98.7),
        (98.7, 98.8, 97.2, 97.4),
        (97.4, 98.4, 97.3, 98.3),
        (98.3, 99.3, 98.2, 99.2),
    ]);
    for (offset, mut candle) in tail.into_iter().enumerate() {
        candle.time = START_TIME + 60 * (10 + offset) as i64;
        candles.push(candle);
    }
    candles
}

/// Bullish BOS, bearish CHoCH at 8, wick-only sweep of the low at 8 on
/// candle 11 that never closes through, and a demand gap at 14
pub fn scenario_c() -> Vec<Candle> {
    series(&[
        (100.0, 100.5, 99.5, 100.2),
        (100.2, 101.0, 100.0, 100.8),
        (100.8, 100.9, 99.8, 99.9),
        (99.9, 100.6, 99.85, 100.5),
        (100.5, 101.6, 100.4, 101.5),
        (101.5, 101.55, 100.6, 100.7),
        (100.7, 100.9, 100.3, 100.4),
        (100.4, 100.8, 100.35, 100.75),
        (100.75, 100.78, 99.0, 99.2),
        (99.2, 99.6, 99.1, 99.5),
        (99.5, 99.9, 99.4, 99.8),
        (99.8, 99.85, 98.7, 99.1),
        (99.1, 99.5, 98.9, 99.4),
        (99.4, 99.7, 99.2, 99.6),
        (99.6, 99.85, 99.55, 99.8),
    ])
}

/// High at 1, pullback low at 2, gapping close through the high at 4
pub fn internal_range() -> Vec<Candle> {
    series(&[
        (100.0, 100.5, 99.8, 100.2),
        (100.2, 101.5, 100.1, 101.2),
        (101.1, 101.2, 100.0, 100.2),
        (100.2, 101.4, 100.1, 101.3),
        (101.3, 102.0, 101.25, 101.9),
        (101.9, 102.3, 101.7, 102.2),
    ])
}

/// Low at 1, high at 2, IFC low at 3 sweeping 1, then two stacked demand
/// gaps before the close through the high at 6
pub fn ifc_inducement() -> Vec<Candle> {
    series(&[
        (101.0, 101.2, 100.4, 100.5),
        (100.5, 100.7, 100.0, 100.6),
        (100.6, 102.0, 100.5, 101.8),
        (100.4, 100.5, 99.8, 100.3),
        (100.3, 100.9, 100.2, 100.85),
        (100.85, 101.4, 100.6, 101.3),
        (101.3, 102.3, 100.95, 102.2),
    ])
}

/// High at 1 swept by candle 3 before it could hold, then a supply gap
pub fn liquidity_sweep() -> Vec<Candle> {
    series(&[
        (100.0, 100.5, 99.6, 100.3),
        (100.3, 102.0, 100.2, 101.5),
        (101.5, 101.6, 100.9, 101.0),
        (100.9, 102.5, 100.4, 101.8),
        (101.8, 101.9, 100.3, 100.5),
        (100.3, 100.35, 99.8, 99.9),
    ])
}

/// High at 1 held into an extremum, swept by candle 5, then a supply gap
pub fn extremum_sweep() -> Vec<Candle> {
    series(&[
        (100.0, 100.5, 99.6, 100.3),
        (100.3, 102.0, 100.2, 101.5),
        (101.5, 101.6, 100.9, 101.0),
        (101.0, 101.2, 100.7, 100.8),
        (100.8, 101.0, 100.5, 100.9),
        (100.9, 102.5, 100.4, 101.8),
        (101.8, 101.9, 100.3, 100.5),
        (100.3, 100.35, 99.8, 99.9),
    ])
}

/// Scenario C up to candle 10, where the high at 10 rejects the CHoCH level
/// of 99.8, then a supply gap
pub fn choch_rejection() -> Vec<Candle> {
    series(&[
        (100.0, 100.5, 99.5, 100.2),
        (100.2, 101.0, 100.0, 100.8),
        (100.8, 100.9, 99.8, 99.9),
        (99.9, 100.6, 99.85, 100.5),
        (100.5, 101.6, 100.4, 101.5),
        (101.5, 101.55, 100.6, 100.7),
        (100.7, 100.9, 100.3, 100.4),
        (100.4, 100.8, 100.35, 100.75),
        (100.75, 100.78, 99.0, 99.2),
        (99.2, 99.6, 99.1, 99.5),
        (99.5, 99.9, 99.4, 99.8),
        (99.6, 99.7, 99.0, 99.1),
        (99.1, 99.3, 98.6, 98.7),
    ])
}

/// All fixtures, for property checks
pub fn all() -> Vec<Vec<Candle>> {
    vec![
        scenario_a(),
        scenario_b(),
        scenario_b_lower_high(),
        scenario_c(),
        internal_range(),
        ifc_inducement(),
        liquidity_sweep(),
        extremum_sweep(),
        choch_rejection(),
    ]
}
