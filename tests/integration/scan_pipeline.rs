//! End-to-end scans over the in-memory source.

use std::sync::Arc;

use cradle_screener::config::{AnalysisConfig, AppConfig, ScanConfig};
use cradle_screener::engine::scanner::Screener;
use cradle_screener::report::{self, GroupedReport, CHOCH_HEADING, EMPTY_NOTICE, UPTREND_HEADING};
use cradle_screener::types::{CradleSetup, MarketInfo, MarketType, Timeframe, TrendState};

use crate::mock_source::*;

fn unpaced() -> ScanConfig {
    ScanConfig {
        request_interval_ms: 0,
        ..ScanConfig::default()
    }
}

fn mixed_universe() -> MockSource {
    MockSource::new()
        .with_series("BTC/USDT:USDT", uptrend_bullish())
        .with_series("ETH/USDT:USDT", downtrend_bearish())
        .with_series("SOL/USDT:USDT", choch_bullish())
        .with_series("XRP/USDT:USDT", flat_bullish())
        .failing("BAD/USDT:USDT")
}

fn screener(source: Arc<MockSource>, scan: ScanConfig) -> Screener {
    Screener::new(source, scan, AnalysisConfig::default())
}

#[tokio::test]
async fn test_full_scan_keeps_only_aligned_setups() {
    let source = Arc::new(mixed_universe());
    let report = screener(source.clone(), unpaced())
        .run_scan(&[Timeframe::H1, Timeframe::H4])
        .await;

    assert_eq!(report.symbols_scanned, 5);
    assert_eq!(report.pairs_evaluated, 10);
    assert_eq!(report.skipped.fetch_failed, 2);
    assert_eq!(source.request_count(), 10);

    let rows: Vec<(Timeframe, &str, CradleSetup, String)> = report
        .results
        .iter()
        .map(|r| (r.timeframe, r.symbol.as_str(), r.setup, r.trend.to_string()))
        .collect();
    assert_eq!(
        rows,
        vec![
            (Timeframe::H1, "BTC/USDT:USDT", CradleSetup::Bullish, "Uptrend (BoS)".to_string()),
            (Timeframe::H1, "ETH/USDT:USDT", CradleSetup::Bearish, "Downtrend".to_string()),
            (Timeframe::H4, "BTC/USDT:USDT", CradleSetup::Bullish, "Uptrend (BoS)".to_string()),
            (Timeframe::H4, "ETH/USDT:USDT", CradleSetup::Bearish, "Downtrend".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_iteration_is_timeframe_major() {
    let source = Arc::new(mixed_universe());
    screener(source.clone(), unpaced())
        .run_scan(&[Timeframe::D1, Timeframe::H4])
        .await;

    let requested = source.requested();
    assert_eq!(requested.len(), 10);
    assert!(requested[..5].iter().all(|(_, tf)| *tf == Timeframe::D1));
    assert!(requested[5..].iter().all(|(_, tf)| *tf == Timeframe::H4));
    assert_eq!(requested[0].0, "BAD/USDT:USDT");
    assert_eq!(requested[4].0, "XRP/USDT:USDT");
}

#[tokio::test]
async fn test_choch_watchlist_adds_third_group() {
    let scan = ScanConfig {
        include_choch_watchlist: true,
        ..unpaced()
    };
    let report = screener(Arc::new(mixed_universe()), scan)
        .run_scan(&[Timeframe::H1])
        .await;

    let grouped = GroupedReport::from(report);
    assert_eq!(grouped.total, 3);
    assert_eq!(grouped.groups.uptrend.len(), 1);
    assert_eq!(grouped.groups.downtrend.len(), 1);
    assert_eq!(grouped.groups.change_of_character.len(), 1);
    assert_eq!(grouped.groups.change_of_character[0].symbol, "SOL/USDT:USDT");
    assert_eq!(grouped.groups.change_of_character[0].trend, TrendState::ChangeOfCharacter);

    let text = report::render_groups(&grouped.groups);
    assert!(text.contains(UPTREND_HEADING));
    assert!(text.contains(CHOCH_HEADING));
}

#[tokio::test]
async fn test_universe_filter_skips_other_market_types() {
    let spot = MarketInfo {
        symbol: "BTC/USDT".into(),
        market_type: MarketType::Spot,
        settle: None,
        ..swap_market("BTC/USDT")
    };
    let dated = MarketInfo {
        symbol: "BTC/USDT:USDT-251226".into(),
        market_type: MarketType::Future,
        ..swap_market("BTC/USDT:USDT-251226")
    };
    let source = Arc::new(
        MockSource::new()
            .with_series("BTC/USDT:USDT", uptrend_bullish())
            .with_market(spot)
            .with_market(dated),
    );

    let report = screener(source.clone(), unpaced()).run_scan(&[Timeframe::H1]).await;
    assert_eq!(report.symbols_scanned, 1);
    assert_eq!(source.requested(), vec![("BTC/USDT:USDT".to_string(), Timeframe::H1)]);
}

#[tokio::test]
async fn test_listing_failure_yields_empty_report() {
    let source = Arc::new(mixed_universe().with_listing_error("exchange down"));
    let report = screener(source.clone(), unpaced())
        .run_scan(Timeframe::DEFAULT_SCAN)
        .await;

    assert!(report.results.is_empty());
    assert_eq!(source.request_count(), 0);

    let grouped = GroupedReport::from(report);
    assert_eq!(grouped.notice, Some(EMPTY_NOTICE));
    assert_eq!(report::render_groups(&grouped.groups), EMPTY_NOTICE);
}

#[tokio::test]
async fn test_short_history_is_skipped() {
    let mut short = uptrend_bullish();
    short.drain(..15);
    let source = Arc::new(MockSource::new().with_series("NEW/USDT:USDT", short));

    let report = screener(source, unpaced()).run_scan(&[Timeframe::H1]).await;
    assert!(report.results.is_empty());
    assert_eq!(report.skipped.insufficient_data, 1);
}

#[tokio::test]
async fn test_scan_is_idempotent_on_frozen_series() {
    let screener = screener(Arc::new(mixed_universe()), unpaced());
    let first = screener.run_scan(Timeframe::DEFAULT_SCAN).await;
    let second = screener.run_scan(Timeframe::DEFAULT_SCAN).await;
    assert_eq!(first.results, second.results);
    assert_eq!(first.skipped, second.skipped);
}

#[tokio::test]
async fn test_concurrent_workers_preserve_order() {
    let sequential = screener(Arc::new(mixed_universe()), unpaced())
        .run_scan(Timeframe::DEFAULT_SCAN)
        .await;
    let parallel = screener(
        Arc::new(mixed_universe()),
        ScanConfig {
            max_concurrency: 4,
            ..unpaced()
        },
    )
    .run_scan(Timeframe::DEFAULT_SCAN)
    .await;
    assert_eq!(sequential.results, parallel.results);
}

#[tokio::test(start_paused = true)]
async fn test_default_config_paces_requests() {
    let cfg = AppConfig::default();
    let source = Arc::new(
        MockSource::new()
            .with_series("BTC/USDT:USDT", uptrend_bullish())
            .with_series("ETH/USDT:USDT", downtrend_bearish()),
    );
    let screener = Screener::from_config(source, &cfg);

    let start = tokio::time::Instant::now();
    let report = screener.run_scan(Timeframe::DEFAULT_SCAN).await;
    let elapsed = start.elapsed();

    // Six requests at one per 300 ms: the first is free.
    assert_eq!(report.pairs_evaluated, 6);
    assert!(elapsed >= std::time::Duration::from_millis(1500), "elapsed {elapsed:?}");
    assert_eq!(report.results.len(), 6);
}
