//! Shared types for the Cradle screener.
//!
//! These types form the data model used across all modules. Exchange,
//! analysis, engine, and presentation code all depend on this module and
//! on nothing of each other's internals.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

// ---------------------------------------------------------------------------
// Candles
// ---------------------------------------------------------------------------

/// A single OHLCV candle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Candle open time.
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// Volume in base currency.
    pub volume: f64,
}

impl Candle {
    /// `close > open`.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// `close < open`.
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// A time-ordered candle series for one (symbol, timeframe).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandleSeries {
    pub symbol: String,
    pub timeframe: Timeframe,
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Build a series, sorting by timestamp and dropping repeated
    /// timestamps so that ordering is strictly increasing.
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe, mut candles: Vec<Candle>) -> Self {
        candles.sort_by_key(|c| c.timestamp);
        candles.dedup_by_key(|c| c.timestamp);
        Self {
            symbol: symbol.into(),
            timeframe,
            candles,
        }
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Closing prices in series order.
    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    /// The last two candles as `(prev, curr)`, if the series has at least two.
    pub fn last_pair(&self) -> Option<(&Candle, &Candle)> {
        match self.candles.as_slice() {
            [.., prev, curr] => Some((prev, curr)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Timeframes
// ---------------------------------------------------------------------------

/// Candle timeframe. The string forms are the user-facing identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "3m")]
    M3,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "10m")]
    M10,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "20m")]
    M20,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "2h")]
    H2,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "6h")]
    H6,
    #[serde(rename = "8h")]
    H8,
    #[serde(rename = "10h")]
    H10,
    #[serde(rename = "12h")]
    H12,
    #[serde(rename = "16h")]
    H16,
    #[serde(rename = "1d")]
    D1,
    #[serde(rename = "1w")]
    W1,
}

impl Timeframe {
    /// Every selectable timeframe, shortest first.
    pub const ALL: &'static [Timeframe] = &[
        Timeframe::M1,
        Timeframe::M3,
        Timeframe::M5,
        Timeframe::M10,
        Timeframe::M15,
        Timeframe::M20,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H2,
        Timeframe::H4,
        Timeframe::H6,
        Timeframe::H8,
        Timeframe::H10,
        Timeframe::H12,
        Timeframe::H16,
        Timeframe::D1,
        Timeframe::W1,
    ];

    /// Timeframes preselected when the caller doesn't choose.
    pub const DEFAULT_SCAN: &'static [Timeframe] = &[Timeframe::H1, Timeframe::H4, Timeframe::D1];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M3 => "3m",
            Timeframe::M5 => "5m",
            Timeframe::M10 => "10m",
            Timeframe::M15 => "15m",
            Timeframe::M20 => "20m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H2 => "2h",
            Timeframe::H4 => "4h",
            Timeframe::H6 => "6h",
            Timeframe::H8 => "8h",
            Timeframe::H10 => "10h",
            Timeframe::H12 => "12h",
            Timeframe::H16 => "16h",
            Timeframe::D1 => "1d",
            Timeframe::W1 => "1w",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parse a timeframe identifier such as `"4h"` (case-insensitive).
impl std::str::FromStr for Timeframe {
    type Err = ScreenerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Timeframe::ALL
            .iter()
            .copied()
            .find(|tf| tf.as_str() == wanted)
            .ok_or_else(|| ScreenerError::InvalidTimeframe(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Markets
// ---------------------------------------------------------------------------

/// Kind of instrument listed by an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketType {
    Spot,
    Swap,
    Future,
}

impl fmt::Display for MarketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketType::Spot => write!(f, "spot"),
            MarketType::Swap => write!(f, "swap"),
            MarketType::Future => write!(f, "future"),
        }
    }
}

/// A listed instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketInfo {
    /// Unified symbol, e.g. `BTC/USDT:USDT`.
    pub symbol: String,
    /// Exchange-native id used on the wire, e.g. `BTCUSDT`.
    pub id: String,
    pub base: String,
    pub quote: String,
    /// Settlement currency (margin coin) for derivatives.
    pub settle: Option<String>,
    pub market_type: MarketType,
}

/// Unified symbol in `BASE/QUOTE:SETTLE` form (`BASE/QUOTE` without settle).
pub fn unified_symbol(base: &str, quote: &str, settle: Option<&str>) -> String {
    match settle {
        Some(s) => format!("{base}/{quote}:{s}"),
        None => format!("{base}/{quote}"),
    }
}

// ---------------------------------------------------------------------------
// Market structure
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwingKind {
    High,
    Low,
}

/// A confirmed pivot in a candle series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SwingPoint {
    /// Index into the source series.
    pub index: usize,
    pub kind: SwingKind,
    /// The candle's high for a High swing, its low for a Low swing.
    pub price: f64,
}

/// Structural label of a swing relative to the previous swing of the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrendLabel {
    HH,
    LH,
    HL,
    LL,
}

impl fmt::Display for TrendLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TrendLabel::HH => "HH",
            TrendLabel::LH => "LH",
            TrendLabel::HL => "HL",
            TrendLabel::LL => "LL",
        };
        f.write_str(s)
    }
}

/// Trend read from the most recent three labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructurePattern {
    NoTrend,
    Uptrend,
    Downtrend,
    TrendBroken,
}

impl fmt::Display for StructurePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StructurePattern::NoTrend => write!(f, "No Trend"),
            StructurePattern::Uptrend => write!(f, "Uptrend"),
            StructurePattern::Downtrend => write!(f, "Downtrend"),
            StructurePattern::TrendBroken => write!(f, "Trend Broken"),
        }
    }
}

/// Final structural state of a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrendState {
    /// A pattern state, optionally confirmed by a break of structure.
    Structure {
        pattern: StructurePattern,
        break_of_structure: bool,
    },
    /// Only contradicting swings were seen over the whole series.
    ChangeOfCharacter,
}

impl TrendState {
    pub const fn plain(pattern: StructurePattern) -> Self {
        TrendState::Structure {
            pattern,
            break_of_structure: false,
        }
    }

    pub const fn with_bos(pattern: StructurePattern) -> Self {
        TrendState::Structure {
            pattern,
            break_of_structure: true,
        }
    }

    /// `Uptrend` or `Uptrend (BoS)`.
    pub fn is_uptrend(&self) -> bool {
        matches!(
            self,
            TrendState::Structure {
                pattern: StructurePattern::Uptrend,
                ..
            }
        )
    }

    /// `Downtrend` or `Downtrend (BoS)`.
    pub fn is_downtrend(&self) -> bool {
        matches!(
            self,
            TrendState::Structure {
                pattern: StructurePattern::Downtrend,
                ..
            }
        )
    }

    pub fn is_change_of_character(&self) -> bool {
        matches!(self, TrendState::ChangeOfCharacter)
    }
}

impl fmt::Display for TrendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendState::Structure {
                pattern,
                break_of_structure: true,
            } => write!(f, "{pattern} (BoS)"),
            TrendState::Structure { pattern, .. } => write!(f, "{pattern}"),
            TrendState::ChangeOfCharacter => write!(f, "Change of Character"),
        }
    }
}

impl Serialize for TrendState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

// ---------------------------------------------------------------------------
// Setups & results
// ---------------------------------------------------------------------------

/// Direction of a detected cradle setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CradleSetup {
    Bullish,
    Bearish,
}

impl fmt::Display for CradleSetup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CradleSetup::Bullish => write!(f, "Bullish"),
            CradleSetup::Bearish => write!(f, "Bearish"),
        }
    }
}

/// One output row of a scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScanResult {
    #[serde(rename = "Symbol")]
    pub symbol: String,
    #[serde(rename = "Timeframe")]
    pub timeframe: Timeframe,
    #[serde(rename = "Setup")]
    pub setup: CradleSetup,
    #[serde(rename = "Trend")]
    pub trend: TrendState,
}

impl fmt::Display for ScanResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} cradle | {}",
            self.symbol, self.timeframe, self.setup, self.trend
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for the screener.
#[derive(Debug, thiserror::Error)]
pub enum ScreenerError {
    #[error("Exchange error ({exchange}): {message}")]
    Exchange { exchange: String, message: String },

    #[error("Timeframe {timeframe} is not offered by {exchange}")]
    UnsupportedTimeframe {
        exchange: String,
        timeframe: Timeframe,
    },

    #[error("Insufficient data: need {needed} candles, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("Fetch timed out for {symbol} [{timeframe}]")]
    FetchTimeout { symbol: String, timeframe: Timeframe },

    #[error("Unknown timeframe: {0}")]
    InvalidTimeframe(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
