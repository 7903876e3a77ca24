//! Bitget USDT-M perpetual futures market data.
//!
//! API docs: https://www.bitget.com/api-doc/contract/intro
//! Base URL: https://api.bitget.com
//! Rate limit: 20 requests/second per IP on public market endpoints
//! Auth: Not required for market data.
//!
//! Responses are wrapped in `{"code": "00000", "msg": "success", "data": ...}`;
//! any other code is an error even when the HTTP status is 200.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::SeriesSource;
use crate::config::ExchangeConfig;
use crate::types::{
    unified_symbol, Candle, CandleSeries, MarketInfo, MarketType, ScreenerError, Timeframe,
};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const EXCHANGE_NAME: &str = "bitget";
const SUCCESS_CODE: &str = "00000";
const CONTRACTS_PATH: &str = "/api/v2/mix/market/contracts";
const CANDLES_PATH: &str = "/api/v2/mix/market/candles";

/// The candles endpoint returns at most this many rows per call.
const MAX_CANDLE_LIMIT: usize = 1000;

// ---------------------------------------------------------------------------
// API response types (Bitget JSON → Rust)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    code: String,
    #[serde(default)]
    msg: String,
    data: Option<T>,
}

/// One entry of `/api/v2/mix/market/contracts`. Only the fields we use.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BitgetContract {
    symbol: String,
    base_coin: String,
    quote_coin: String,
    /// "perpetual" or "delivery".
    symbol_type: String,
    /// "normal", "maintain", "limit_open", "restrictedAPI", "off".
    #[serde(default)]
    symbol_status: String,
    #[serde(default)]
    support_margin_coins: Vec<String>,
    /// Expiry in ms for delivery contracts, empty or "0" for perpetuals.
    #[serde(default)]
    delivery_time: String,
}

/// Candle rows: `[ts_ms, open, high, low, close, base_volume, quote_volume]`,
/// all as strings.
type CandleRow = Vec<String>;

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Bitget public market-data client.
pub struct BitgetClient {
    http: Client,
    base_url: String,
    product_type: String,
    /// Unified symbol → exchange id, filled by `list_markets`.
    ids: RwLock<HashMap<String, String>>,
}

impl BitgetClient {
    pub fn new(cfg: &ExchangeConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(cfg.http_timeout_secs))
            .user_agent(cfg.user_agent.clone())
            .build()
            .context("Failed to build HTTP client for Bitget")?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            product_type: cfg.product_type.clone(),
            ids: RwLock::new(HashMap::new()),
        })
    }

    /// Bitget candle granularity for a timeframe, if the exchange offers it.
    pub fn granularity(timeframe: Timeframe) -> Option<&'static str> {
        match timeframe {
            Timeframe::M1 => Some("1m"),
            Timeframe::M3 => Some("3m"),
            Timeframe::M5 => Some("5m"),
            Timeframe::M15 => Some("15m"),
            Timeframe::M30 => Some("30m"),
            Timeframe::H1 => Some("1H"),
            Timeframe::H2 => Some("2H"),
            Timeframe::H4 => Some("4H"),
            Timeframe::H6 => Some("6H"),
            Timeframe::H12 => Some("12H"),
            Timeframe::D1 => Some("1D"),
            Timeframe::W1 => Some("1W"),
            Timeframe::M10
            | Timeframe::M20
            | Timeframe::H8
            | Timeframe::H10
            | Timeframe::H16 => None,
        }
    }

    // -- Internal helpers ------------------------------------------------

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        debug!(url = %url, ?query, "Bitget request");

        let resp = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .context("Bitget API request failed")?;

        let status = resp.status();
        let body = resp.text().await.context("Failed to read Bitget response body")?;
        if !status.is_success() {
            return Err(ScreenerError::Exchange {
                exchange: EXCHANGE_NAME.to_string(),
                message: format!("HTTP {status}: {body}"),
            }
            .into());
        }
        Self::unwrap_envelope(&body)
    }

    /// Parse the `{code, msg, data}` wrapper.
    fn unwrap_envelope<T: DeserializeOwned>(body: &str) -> Result<T> {
        let envelope: Envelope<T> =
            serde_json::from_str(body).context("Failed to parse Bitget response")?;
        if envelope.code != SUCCESS_CODE {
            return Err(ScreenerError::Exchange {
                exchange: EXCHANGE_NAME.to_string(),
                message: format!("code {}: {}", envelope.code, envelope.msg),
            }
            .into());
        }
        envelope.data.context("Bitget response has no data")
    }

    fn to_market(contract: BitgetContract) -> MarketInfo {
        let market_type = match contract.symbol_type.as_str() {
            "perpetual" => MarketType::Swap,
            _ => MarketType::Future,
        };
        // USDT-M contracts settle in the quote coin.
        let settle = contract
            .support_margin_coins
            .first()
            .cloned()
            .unwrap_or_else(|| contract.quote_coin.clone());
        let mut symbol = unified_symbol(&contract.base_coin, &contract.quote_coin, Some(&settle));
        if market_type == MarketType::Future {
            if let Some(expiry) = Self::expiry_code(&contract) {
                symbol = format!("{symbol}-{expiry}");
            }
        }
        MarketInfo {
            symbol,
            id: contract.symbol,
            base: contract.base_coin,
            quote: contract.quote_coin,
            settle: Some(settle),
            market_type,
        }
    }

    /// `YYMMDD` expiry of a delivery contract, from the id suffix
    /// (`BTCUSDT_250328`) or else from `deliveryTime`.
    fn expiry_code(contract: &BitgetContract) -> Option<String> {
        if let Some((_, suffix)) = contract.symbol.split_once('_') {
            if !suffix.is_empty() {
                return Some(suffix.to_string());
            }
        }
        let ms: i64 = contract.delivery_time.parse().ok().filter(|ms| *ms > 0)?;
        let expiry = Utc.timestamp_millis_opt(ms).single()?;
        Some(expiry.format("%y%m%d").to_string())
    }

    fn parse_contracts(contracts: Vec<BitgetContract>) -> HashMap<String, MarketInfo> {
        contracts
            .into_iter()
            .filter(|c| c.symbol_status.is_empty() || c.symbol_status == "normal")
            .map(Self::to_market)
            .map(|m| (m.symbol.clone(), m))
            .collect()
    }

    fn parse_candle(row: &[String]) -> Result<Candle> {
        if row.len() < 6 {
            anyhow::bail!("candle row has {} fields, expected at least 6", row.len());
        }
        let num = |i: usize| -> Result<f64> {
            row[i]
                .parse::<f64>()
                .with_context(|| format!("bad number in candle field {i}: {:?}", row[i]))
        };
        let ms: i64 = row[0]
            .parse()
            .with_context(|| format!("bad candle timestamp: {:?}", row[0]))?;
        let timestamp = Utc
            .timestamp_millis_opt(ms)
            .single()
            .with_context(|| format!("candle timestamp out of range: {ms}"))?;

        Ok(Candle {
            timestamp,
            open: num(1)?,
            high: num(2)?,
            low: num(3)?,
            close: num(4)?,
            volume: num(5)?,
        })
    }

    fn parse_candles(rows: &[CandleRow]) -> Result<Vec<Candle>> {
        rows.iter().map(|r| Self::parse_candle(r)).collect()
    }

    /// Exchange id for a unified symbol. Falls back to stripping the
    /// separators (`BTC/USDT:USDT` → `BTCUSDT`) for symbols not yet listed.
    async fn market_id(&self, symbol: &str) -> String {
        if let Some(id) = self.ids.read().await.get(symbol) {
            return id.clone();
        }
        let pair = symbol.split(':').next().unwrap_or(symbol);
        pair.replace('/', "")
    }
}

// ---------------------------------------------------------------------------
// SeriesSource trait implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl SeriesSource for BitgetClient {
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<CandleSeries> {
        let granularity =
            Self::granularity(timeframe).ok_or_else(|| ScreenerError::UnsupportedTimeframe {
                exchange: EXCHANGE_NAME.to_string(),
                timeframe,
            })?;
        let id = self.market_id(symbol).await;
        let limit = limit.clamp(1, MAX_CANDLE_LIMIT);

        let rows: Vec<CandleRow> = self
            .get(
                CANDLES_PATH,
                &[
                    ("symbol", id),
                    ("productType", self.product_type.clone()),
                    ("granularity", granularity.to_string()),
                    ("limit", limit.to_string()),
                ],
            )
            .await
            .with_context(|| format!("Failed to fetch {symbol} [{timeframe}] candles"))?;

        let candles = Self::parse_candles(&rows)
            .with_context(|| format!("Failed to parse {symbol} [{timeframe}] candles"))?;

        debug!(symbol, %timeframe, count = candles.len(), "Bitget candles fetched");
        Ok(CandleSeries::new(symbol, timeframe, candles))
    }

    async fn list_markets(&self) -> Result<HashMap<String, MarketInfo>> {
        let contracts: Vec<BitgetContract> = self
            .get(CONTRACTS_PATH, &[("productType", self.product_type.clone())])
            .await
            .context("Failed to list Bitget contracts")?;

        let markets = Self::parse_contracts(contracts);

        let mut ids = self.ids.write().await;
        ids.clear();
        ids.extend(markets.values().map(|m| (m.symbol.clone(), m.id.clone())));

        info!(count = markets.len(), product_type = %self.product_type, "Bitget markets loaded");
        Ok(markets)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
