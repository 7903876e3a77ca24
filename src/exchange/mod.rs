//! Exchange integrations.
//!
//! Defines the `SeriesSource` trait and provides:
//! - Bitget: USDT-margined perpetual futures (public market data only)

pub mod bitget;

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;

use crate::types::{CandleSeries, MarketInfo, Timeframe};

/// Abstraction over an OHLCV market-data provider.
///
/// Implementors fetch point-in-time candle batches and list tradable
/// markets. Transport concerns (connections, pagination, auth) stay
/// inside the implementation.
#[async_trait]
pub trait SeriesSource: Send + Sync {
    /// Fetch up to `limit` of the most recent candles, oldest first.
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<CandleSeries>;

    /// All listed markets keyed by unified symbol.
    async fn list_markets(&self) -> Result<HashMap<String, MarketInfo>>;
}
