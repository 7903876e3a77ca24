//! Symbol × timeframe scan orchestrator.
//!
//! Discovers the tradable universe from the configured `SeriesSource`,
//! walks every (timeframe, symbol) pair under a shared token bucket, runs
//! the analysis pipeline on each fetched series, and keeps the pairs whose
//! cradle setup agrees with the market structure.
//!
//! A pair that cannot be fetched or analysed is skipped and counted. The
//! scan itself never fails.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::analysis::analyze_series;
use crate::config::{AnalysisConfig, AppConfig, ScanConfig};
use crate::engine::rate_limit::TokenBucket;
use crate::exchange::SeriesSource;
use crate::types::{
    CandleSeries, CradleSetup, MarketInfo, MarketType, ScanResult, ScreenerError, Timeframe,
    TrendState,
};

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Why a pair produced no verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    FetchFailed,
    Timeout,
    InsufficientData,
}

/// Result of evaluating one (symbol, timeframe) pair.
#[derive(Debug, Clone, PartialEq)]
pub enum PairOutcome {
    Matched(ScanResult),
    NoMatch,
    Skipped(SkipReason),
}

/// Skipped-pair counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SkipCounts {
    pub fetch_failed: usize,
    pub timeout: usize,
    pub insufficient_data: usize,
}

impl SkipCounts {
    pub fn total(&self) -> usize {
        self.fetch_failed + self.timeout + self.insufficient_data
    }

    fn record(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::FetchFailed => self.fetch_failed += 1,
            SkipReason::Timeout => self.timeout += 1,
            SkipReason::InsufficientData => self.insufficient_data += 1,
        }
    }
}

/// Summary of one full pass over the cross-product.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub timeframes: Vec<Timeframe>,
    pub symbols_scanned: usize,
    pub pairs_evaluated: usize,
    pub skipped: SkipCounts,
    /// Timeframe-major, then symbol order.
    pub results: Vec<ScanResult>,
}

impl ScanReport {
    fn empty(started_at: DateTime<Utc>, timeframes: &[Timeframe]) -> Self {
        Self {
            started_at,
            elapsed_ms: elapsed_ms_since(started_at),
            timeframes: timeframes.to_vec(),
            symbols_scanned: 0,
            pairs_evaluated: 0,
            skipped: SkipCounts::default(),
            results: Vec::new(),
        }
    }
}

fn elapsed_ms_since(started_at: DateTime<Utc>) -> u64 {
    u64::try_from((Utc::now() - started_at).num_milliseconds()).unwrap_or(0)
}

/// Whether a setup is reported given the structure it appeared in.
///
/// Bullish needs an uptrend, Bearish a downtrend; the BoS variants count.
/// With `include_choch` any setup under a change of character is kept too.
pub fn qualifies(setup: CradleSetup, trend: TrendState, include_choch: bool) -> bool {
    let aligned = match setup {
        CradleSetup::Bullish => trend.is_uptrend(),
        CradleSetup::Bearish => trend.is_downtrend(),
    };
    aligned || (include_choch && trend.is_change_of_character())
}

// ---------------------------------------------------------------------------
// Screener
// ---------------------------------------------------------------------------

/// Drives scans against a single market-data source.
pub struct Screener {
    source: Arc<dyn SeriesSource>,
    scan: ScanConfig,
    analysis: AnalysisConfig,
    limiter: TokenBucket,
}

impl Screener {
    pub fn new(source: Arc<dyn SeriesSource>, scan: ScanConfig, analysis: AnalysisConfig) -> Self {
        let limiter = TokenBucket::new(scan.burst, scan.request_interval());
        Self {
            source,
            scan,
            analysis,
            limiter,
        }
    }

    pub fn from_config(source: Arc<dyn SeriesSource>, cfg: &AppConfig) -> Self {
        Self::new(source, cfg.scan.clone(), cfg.analysis.clone())
    }

    /// Symbols containing `quote_marker` with the wanted market type, sorted.
    pub fn select_symbols(
        markets: &HashMap<String, MarketInfo>,
        quote_marker: &str,
        market_type: MarketType,
    ) -> Vec<String> {
        let mut symbols: Vec<String> = markets
            .iter()
            .filter(|(symbol, info)| {
                symbol.contains(quote_marker) && info.market_type == market_type
            })
            .map(|(symbol, _)| symbol.clone())
            .collect();
        symbols.sort();
        symbols
    }

    /// List markets and apply the configured universe filter.
    pub async fn discover_symbols(&self) -> Result<Vec<String>> {
        let markets = self
            .source
            .list_markets()
            .await
            .context("Failed to list markets")?;
        let symbols =
            Self::select_symbols(&markets, &self.scan.quote_marker, self.scan.market_type);
        info!(
            listed = markets.len(),
            selected = symbols.len(),
            marker = %self.scan.quote_marker,
            market_type = %self.scan.market_type,
            "Markets discovered"
        );
        Ok(symbols)
    }

    /// Discover the universe, then scan it across `timeframes`.
    ///
    /// A market-listing failure yields an empty report.
    pub async fn run_scan(&self, timeframes: &[Timeframe]) -> ScanReport {
        let started_at = Utc::now();
        match self.discover_symbols().await {
            Ok(symbols) => self.scan_symbols(&symbols, timeframes).await,
            Err(e) => {
                error!(error = %format!("{e:#}"), "Market discovery failed, nothing to scan");
                ScanReport::empty(started_at, timeframes)
            }
        }
    }

    /// Scan an explicit symbol list across `timeframes`.
    pub async fn scan_symbols(&self, symbols: &[String], timeframes: &[Timeframe]) -> ScanReport {
        let started_at = Utc::now();
        let pairs: Vec<(Timeframe, String)> = timeframes
            .iter()
            .flat_map(|&tf| symbols.iter().map(move |s| (tf, s.clone())))
            .collect();
        let pair_count = pairs.len();

        let tf_list: Vec<&str> = timeframes.iter().map(Timeframe::as_str).collect();
        info!(
            symbols = symbols.len(),
            timeframes = %tf_list.join(","),
            pairs = pair_count,
            concurrency = self.scan.max_concurrency,
            "Starting scan"
        );

        let mut outcomes: Vec<(usize, PairOutcome)> = stream::iter(pairs.into_iter().enumerate())
            .map(|(i, (tf, symbol))| async move { (i, self.evaluate_pair(&symbol, tf).await) })
            .buffer_unordered(self.scan.max_concurrency.max(1))
            .collect()
            .await;
        outcomes.sort_by_key(|(i, _)| *i);

        let mut skipped = SkipCounts::default();
        let mut results = Vec::new();
        for (_, outcome) in outcomes {
            match outcome {
                PairOutcome::Matched(result) => results.push(result),
                PairOutcome::NoMatch => {}
                PairOutcome::Skipped(reason) => skipped.record(reason),
            }
        }

        let report = ScanReport {
            started_at,
            elapsed_ms: elapsed_ms_since(started_at),
            timeframes: timeframes.to_vec(),
            symbols_scanned: symbols.len(),
            pairs_evaluated: pair_count,
            skipped,
            results,
        };
        info!(
            pairs = report.pairs_evaluated,
            matched = report.results.len(),
            skipped = report.skipped.total(),
            elapsed_ms = report.elapsed_ms,
            "Scan finished"
        );
        report
    }

    /// Fetch one pair under the limiter and timeout, then evaluate it.
    pub async fn evaluate_pair(&self, symbol: &str, timeframe: Timeframe) -> PairOutcome {
        self.limiter.acquire().await;

        let fetch = self
            .source
            .fetch_candles(symbol, timeframe, self.scan.candle_limit);
        let series = match tokio::time::timeout(self.scan.fetch_timeout(), fetch).await {
            Ok(Ok(series)) => series,
            Ok(Err(e)) => {
                warn!(
                    symbol,
                    timeframe = %timeframe,
                    error = %format!("{e:#}"),
                    "Fetch failed, skipping pair"
                );
                return PairOutcome::Skipped(SkipReason::FetchFailed);
            }
            Err(_) => {
                let e = ScreenerError::FetchTimeout {
                    symbol: symbol.to_string(),
                    timeframe,
                };
                warn!(error = %e, "Skipping pair");
                return PairOutcome::Skipped(SkipReason::Timeout);
            }
        };

        let outcome = self.evaluate_series(symbol, timeframe, &series);
        if outcome == PairOutcome::Skipped(SkipReason::InsufficientData) {
            let e = ScreenerError::InsufficientData {
                needed: self.scan.min_candles,
                got: series.len(),
            };
            warn!(symbol, timeframe = %timeframe, error = %e, "Skipping pair");
        }
        outcome
    }

    /// Run the analysis pipeline on an already fetched series.
    pub fn evaluate_series(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        series: &CandleSeries,
    ) -> PairOutcome {
        if series.len() < self.scan.min_candles {
            return PairOutcome::Skipped(SkipReason::InsufficientData);
        }

        let analysis = analyze_series(series, &self.analysis);
        let trend = analysis.trend();
        debug!(
            symbol,
            timeframe = %timeframe,
            candles = series.len(),
            swings = analysis.structure.swings.labels.len(),
            trend = %trend,
            setup = ?analysis.setup,
            "Pair analysed"
        );

        match analysis.setup {
            Some(setup) if qualifies(setup, trend, self.scan.include_choch_watchlist) => {
                PairOutcome::Matched(ScanResult {
                    symbol: symbol.to_string(),
                    timeframe,
                    setup,
                    trend,
                })
            }
            _ => PairOutcome::NoMatch,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
