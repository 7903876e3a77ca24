//! Fractal swing detection.
//!
//! A candle at index `i` is a swing high when the highs `left` candles
//! before and `right` candles after are both strictly lower. Swing lows
//! mirror this on the low series. Candles within `left`/`right` of either
//! end of the series are never flagged.

use crate::types::{Candle, CandleSeries, SwingKind, SwingPoint};

/// Default window radius on each side.
pub const DEFAULT_RADIUS: usize = 2;

/// Per-candle swing annotation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwingFlags {
    pub high: bool,
    pub low: bool,
}

impl SwingFlags {
    pub fn any(&self) -> bool {
        self.high || self.low
    }
}

/// A series together with its swing flags, one entry per candle.
#[derive(Debug, Clone)]
pub struct SwingAnnotation<'a> {
    series: &'a CandleSeries,
    flags: Vec<SwingFlags>,
}

impl<'a> SwingAnnotation<'a> {
    pub fn flags(&self) -> &[SwingFlags] {
        &self.flags
    }

    /// Flagged candles in series order, paired with their index.
    pub fn flagged(&self) -> impl Iterator<Item = (usize, &'a Candle, SwingFlags)> + '_ {
        self.series
            .candles()
            .iter()
            .zip(self.flags.iter().copied())
            .enumerate()
            .filter(|(_, (_, f))| f.any())
            .map(|(i, (c, f))| (i, c, f))
    }

    /// Swing points in index order. A candle flagged both ways yields its
    /// High point before its Low point.
    pub fn swing_points(&self) -> Vec<SwingPoint> {
        let mut points = Vec::new();
        for (index, candle, flags) in self.flagged() {
            if flags.high {
                points.push(SwingPoint {
                    index,
                    kind: SwingKind::High,
                    price: candle.high,
                });
            }
            if flags.low {
                points.push(SwingPoint {
                    index,
                    kind: SwingKind::Low,
                    price: candle.low,
                });
            }
        }
        points
    }
}

/// Flag swing highs and lows over `series`.
pub fn detect_swings(series: &CandleSeries, left: usize, right: usize) -> SwingAnnotation<'_> {
    let candles = series.candles();
    let len = candles.len();
    let mut flags = vec![SwingFlags::default(); len];

    // Needs a neighbour on both sides; short series stay unflagged.
    if len > left + right {
        for i in left..len - right {
            let (before, here, after) = (&candles[i - left], &candles[i], &candles[i + right]);
            flags[i] = SwingFlags {
                high: before.high < here.high && after.high < here.high,
                low: before.low > here.low && after.low > here.low,
            };
        }
    }

    SwingAnnotation { series, flags }
}
