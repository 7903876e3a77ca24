//! Price-action analysis.
//!
//! - `swing`: fractal swing-high / swing-low detection
//! - `structure`: HH/HL/LH/LL labelling and trend state
//! - `cradle`: EMA cradle zone pullback setups
//!
//! Everything here is a pure function of the candle series.

pub mod cradle;
pub mod structure;
pub mod swing;

use crate::config::AnalysisConfig;
use crate::types::{CandleSeries, CradleSetup, TrendState};

use structure::StructureAnalysis;

/// Combined read of one series.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesAnalysis {
    pub structure: StructureAnalysis,
    pub setup: Option<CradleSetup>,
}

impl SeriesAnalysis {
    pub fn trend(&self) -> TrendState {
        self.structure.state
    }
}

/// Run swing detection, structure classification, and cradle detection.
pub fn analyze_series(series: &CandleSeries, cfg: &AnalysisConfig) -> SeriesAnalysis {
    let annotation = swing::detect_swings(series, cfg.swing_left, cfg.swing_right);
    let structure = structure::classify_structure(&annotation, cfg.dual_swing_policy);
    let setup = cradle::detect_cradle(series, cfg.fast_ema_span, cfg.slow_ema_span);
    SeriesAnalysis { structure, setup }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Candle, Timeframe};
    use chrono::{TimeZone, Utc};

    fn wavy_series() -> CandleSeries {
        let candles = (0..100)
            .map(|i| {
                let mid = 50.0 + (i as f64 * 0.3).sin() * 5.0 + i as f64 * 0.05;
                let (open, close) = if i % 2 == 0 {
                    (mid - 0.4, mid + 0.4)
                } else {
                    (mid + 0.4, mid - 0.4)
                };
                Candle {
                    timestamp: Utc.timestamp_opt(i * 900, 0).unwrap(),
                    open,
                    high: mid + 1.0,
                    low: mid - 1.0,
                    close,
                    volume: 100.0,
                }
            })
            .collect();
        CandleSeries::new("WAVE/USDT:USDT", Timeframe::M15, candles)
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let series = wavy_series();
        let cfg = AnalysisConfig::default();
        let first = analyze_series(&series, &cfg);
        for _ in 0..3 {
            assert_eq!(analyze_series(&series, &cfg), first);
        }
        assert!(!first.structure.swings.labels.is_empty());
    }
}
