//! In-memory series source for integration testing.
//!
//! Serves synthetic candle series keyed by symbol, lists every stored
//! symbol as a USDT swap, and can be told to fail specific symbols or the
//! market listing itself.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use cradle_screener::exchange::SeriesSource;
use cradle_screener::types::{Candle, CandleSeries, MarketInfo, MarketType, Timeframe};

/// Deterministic `SeriesSource` backed by fixed candle vectors.
#[derive(Default)]
pub struct MockSource {
    series: HashMap<String, Vec<Candle>>,
    extra_markets: Vec<MarketInfo>,
    failing: HashSet<String>,
    listing_error: Option<String>,
    requests: AtomicUsize,
    requested: Mutex<Vec<(String, Timeframe)>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `candles` for `symbol` on every timeframe.
    pub fn with_series(mut self, symbol: &str, candles: Vec<Candle>) -> Self {
        self.series.insert(symbol.to_string(), candles);
        self
    }

    /// List a market that has no series behind it.
    pub fn with_market(mut self, info: MarketInfo) -> Self {
        self.extra_markets.push(info);
        self
    }

    /// Every fetch for `symbol` returns an error.
    pub fn failing(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_string());
        self
    }

    pub fn with_listing_error(mut self, msg: &str) -> Self {
        self.listing_error = Some(msg.to_string());
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<(String, Timeframe)> {
        self.requested.lock().unwrap().clone()
    }
}

pub fn swap_market(symbol: &str) -> MarketInfo {
    let base = symbol.split('/').next().unwrap_or(symbol);
    MarketInfo {
        symbol: symbol.to_string(),
        id: format!("{base}USDT"),
        base: base.to_string(),
        quote: "USDT".to_string(),
        settle: Some("USDT".to_string()),
        market_type: MarketType::Swap,
    }
}

#[async_trait]
impl SeriesSource for MockSource {
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<CandleSeries> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push((symbol.to_string(), timeframe));

        if self.failing.contains(symbol) {
            return Err(anyhow!("mock fetch failure for {symbol}"));
        }
        let candles = self
            .series
            .get(symbol)
            .ok_or_else(|| anyhow!("unknown symbol {symbol}"))?;
        let skip = candles.len().saturating_sub(limit);
        Ok(CandleSeries::new(symbol, timeframe, candles[skip..].to_vec()))
    }

    async fn list_markets(&self) -> Result<HashMap<String, MarketInfo>> {
        if let Some(msg) = &self.listing_error {
            return Err(anyhow!("{msg}"));
        }
        let mut markets: HashMap<String, MarketInfo> = self
            .series
            .keys()
            .chain(self.failing.iter())
            .map(|s| (s.clone(), swap_market(s)))
            .collect();
        for info in &self.extra_markets {
            markets.insert(info.symbol.clone(), info.clone());
        }
        Ok(markets)
    }
}

// ---------------------------------------------------------------------------
// Synthetic series
// ---------------------------------------------------------------------------

/// 30 hourly candles drifting by `step`, with wick spikes at chosen
/// indices and an explicit (open, close) for the final two candles.
pub fn drift(start: f64, step: f64, spikes: &[(usize, f64)], tail: [(f64, f64); 2]) -> Vec<Candle> {
    let mut candles: Vec<Candle> = (0..30)
        .map(|i| {
            let mid = start + step * i as f64;
            Candle {
                timestamp: Utc.timestamp_opt(1_700_000_000 + i as i64 * 3600, 0).unwrap(),
                open: mid - 0.05,
                high: mid + 0.5,
                low: mid - 0.5,
                close: mid + 0.05,
                volume: 500.0,
            }
        })
        .collect();
    for &(i, v) in spikes {
        if v > 0.0 {
            candles[i].high += v;
        } else {
            candles[i].low += v;
        }
    }
    for (k, (open, close)) in tail.into_iter().enumerate() {
        let c = &mut candles[28 + k];
        c.open = open;
        c.close = close;
        c.high = open.max(close) + 0.5;
        c.low = open.min(close) - 0.5;
    }
    candles
}

/// HH, HL, HH swings; bearish pullback into the EMA band, then a green candle.
pub fn uptrend_bullish() -> Vec<Candle> {
    drift(100.0, 0.2, &[(15, 3.0), (20, -3.0), (25, 3.0)], [(105.6, 104.3), (104.3, 106.1)])
}

/// Grinding lower with LL, LH, LL swings; green pullback into the band, then red.
pub fn downtrend_bearish() -> Vec<Candle> {
    drift(
        200.0,
        -0.2,
        &[(5, -3.0), (10, 3.0), (15, -3.0), (20, 3.0), (25, -3.0)],
        [(194.4, 195.8), (195.8, 194.8)],
    )
}

/// Lower high after an HH/HL start; bullish cradle on the last pair.
pub fn choch_bullish() -> Vec<Candle> {
    drift(100.0, 0.2, &[(5, 5.0), (10, -3.0), (15, 2.0)], [(105.6, 104.3), (104.3, 106.1)])
}

/// Bullish cradle with no swings at all.
pub fn flat_bullish() -> Vec<Candle> {
    drift(100.0, 0.2, &[], [(105.6, 104.3), (104.3, 106.1)])
}
