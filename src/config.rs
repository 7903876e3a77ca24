//! Configuration loading from TOML.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Every field has a default, so a partial file (or no file at all) is a
//! valid configuration.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::analysis::structure::DualSwingPolicy;
use crate::analysis::{cradle, swing};
use crate::types::{MarketType, ScreenerError, Timeframe};

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub exchange: ExchangeConfig,
    pub scan: ScanConfig,
    pub analysis: AnalysisConfig,
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExchangeConfig {
    pub base_url: String,
    /// Bitget mix product line, e.g. `USDT-FUTURES`.
    pub product_type: String,
    pub http_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.bitget.com".to_string(),
            product_type: "USDT-FUTURES".to_string(),
            http_timeout_secs: 30,
            user_agent: "cradle-screener/0.1.0".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ScanConfig {
    /// Timeframes used when the caller doesn't pick any.
    pub default_timeframes: Vec<Timeframe>,
    /// Candles requested per pair.
    pub candle_limit: usize,
    /// Pairs with fewer candles than this are skipped.
    pub min_candles: usize,
    /// One request permit is refilled every interval.
    pub request_interval_ms: u64,
    /// Permits that may accumulate while idle.
    pub burst: u32,
    /// Pairs evaluated at once.
    pub max_concurrency: usize,
    pub fetch_timeout_secs: u64,
    /// Symbol substring a market must contain to be scanned.
    pub quote_marker: String,
    pub market_type: MarketType,
    /// Also emit change-of-character pairs that have a cradle setup.
    pub include_choch_watchlist: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            default_timeframes: Timeframe::DEFAULT_SCAN.to_vec(),
            candle_limit: 100,
            min_candles: 20,
            request_interval_ms: 300,
            burst: 1,
            max_concurrency: 1,
            fetch_timeout_secs: 10,
            quote_marker: "/USDT:USDT".to_string(),
            market_type: MarketType::Swap,
            include_choch_watchlist: false,
        }
    }
}

impl ScanConfig {
    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.request_interval_ms)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AnalysisConfig {
    pub swing_left: usize,
    pub swing_right: usize,
    pub fast_ema_span: usize,
    pub slow_ema_span: usize,
    pub dual_swing_policy: DualSwingPolicy,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            swing_left: swing::DEFAULT_RADIUS,
            swing_right: swing::DEFAULT_RADIUS,
            fast_ema_span: cradle::DEFAULT_FAST_SPAN,
            slow_ema_span: cradle::DEFAULT_SLOW_SPAN,
            dual_swing_policy: DualSwingPolicy::HighOnly,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DashboardConfig {
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: AppConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            return Self::load(path);
        }
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    /// Reject values the analysis pipeline can't run with.
    pub fn validate(&self) -> Result<(), ScreenerError> {
        let a = &self.analysis;
        if a.swing_left == 0 || a.swing_right == 0 {
            return Err(ScreenerError::Config("swing window radii must be >= 1".into()));
        }
        if a.fast_ema_span == 0 || a.slow_ema_span == 0 {
            return Err(ScreenerError::Config("EMA spans must be >= 1".into()));
        }

        let s = &self.scan;
        if s.min_candles < 2 {
            return Err(ScreenerError::Config("min_candles must be >= 2".into()));
        }
        if s.candle_limit < s.min_candles {
            return Err(ScreenerError::Config(format!(
                "candle_limit ({}) is below min_candles ({})",
                s.candle_limit, s.min_candles
            )));
        }
        if s.max_concurrency == 0 {
            return Err(ScreenerError::Config("max_concurrency must be >= 1".into()));
        }
        if s.burst == 0 {
            return Err(ScreenerError::Config("burst must be >= 1".into()));
        }
        if s.default_timeframes.is_empty() {
            return Err(ScreenerError::Config("default_timeframes is empty".into()));
        }
        Ok(())
    }
}
