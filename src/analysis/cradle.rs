//! Cradle setup detection.
//!
//! The cradle zone is the band between a fast and a slow EMA of closes,
//! read at the second-to-last candle. A bearish pullback candle closing
//! inside the zone followed by a bullish candle is a bullish cradle; the
//! mirror image is a bearish cradle.

use crate::types::{Candle, CandleSeries, CradleSetup};

pub const DEFAULT_FAST_SPAN: usize = 10;
pub const DEFAULT_SLOW_SPAN: usize = 20;

/// Exponentially weighted moving average with `alpha = 2 / (span + 1)`.
///
/// Uses adjusted weights: each output is the weighted mean of every value
/// seen so far, so the first output equals the first input and no warm-up
/// values are discarded.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let decay = 1.0 - alpha;

    let mut num = 0.0;
    let mut den = 0.0;
    values
        .iter()
        .map(|&x| {
            num = x + decay * num;
            den = 1.0 + decay * den;
            num / den
        })
        .collect()
}

/// Closed price band between the two EMAs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CradleZone {
    pub low: f64,
    pub high: f64,
}

impl CradleZone {
    pub fn between(a: f64, b: f64) -> Self {
        Self {
            low: a.min(b),
            high: a.max(b),
        }
    }

    /// Inclusive on both edges.
    pub fn contains(&self, price: f64) -> bool {
        self.low <= price && price <= self.high
    }
}

/// Zone at the second-to-last candle, or `None` for fewer than two candles.
pub fn cradle_zone(
    series: &CandleSeries,
    fast_span: usize,
    slow_span: usize,
) -> Option<CradleZone> {
    if series.len() < 2 {
        return None;
    }
    let closes = series.closes();
    let at = closes.len() - 2;
    let fast = ema(&closes, fast_span);
    let slow = ema(&closes, slow_span);
    Some(CradleZone::between(fast[at], slow[at]))
}

/// Judge the last two candles against a zone.
pub fn evaluate_cradle(prev: &Candle, curr: &Candle, zone: CradleZone) -> Option<CradleSetup> {
    if !zone.contains(prev.close) {
        return None;
    }
    if prev.is_bearish() && curr.is_bullish() {
        Some(CradleSetup::Bullish)
    } else if prev.is_bullish() && curr.is_bearish() {
        Some(CradleSetup::Bearish)
    } else {
        None
    }
}

/// Detect a cradle setup on the last two candles of `series`.
pub fn detect_cradle(
    series: &CandleSeries,
    fast_span: usize,
    slow_span: usize,
) -> Option<CradleSetup> {
    let zone = cradle_zone(series, fast_span, slow_span)?;
    let (prev, curr) = series.last_pair()?;
    evaluate_cradle(prev, curr, zone)
}
