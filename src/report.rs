//! Result grouping and terminal rendering.
//!
//! Scan results are split into three display groups by trend state. The
//! grouped form is what the CLI prints and the HTTP API returns.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use crate::engine::scanner::{ScanReport, SkipCounts};
use crate::types::{ScanResult, Timeframe};

pub const EMPTY_NOTICE: &str = "No valid setups found.";

pub const UPTREND_HEADING: &str = "Uptrend (with Cradle Setup)";
pub const DOWNTREND_HEADING: &str = "Downtrend (with Cradle Setup)";
pub const CHOCH_HEADING: &str = "Change of Character (Potential Early Setup)";

/// Results split by trend direction.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GroupedResults {
    pub uptrend: Vec<ScanResult>,
    pub downtrend: Vec<ScanResult>,
    pub change_of_character: Vec<ScanResult>,
}

impl GroupedResults {
    pub fn is_empty(&self) -> bool {
        self.uptrend.is_empty() && self.downtrend.is_empty() && self.change_of_character.is_empty()
    }

    pub fn len(&self) -> usize {
        self.uptrend.len() + self.downtrend.len() + self.change_of_character.len()
    }
}

/// Split results into display groups, preserving input order within each.
pub fn group_results(results: &[ScanResult]) -> GroupedResults {
    let mut groups = GroupedResults::default();
    for result in results {
        if result.trend.is_uptrend() {
            groups.uptrend.push(result.clone());
        } else if result.trend.is_downtrend() {
            groups.downtrend.push(result.clone());
        } else if result.trend.is_change_of_character() {
            groups.change_of_character.push(result.clone());
        }
    }
    groups
}

/// Scan summary plus grouped results, as served over JSON.
#[derive(Debug, Clone, Serialize)]
pub struct GroupedReport {
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    pub timeframes: Vec<Timeframe>,
    pub symbols_scanned: usize,
    pub pairs_evaluated: usize,
    pub skipped: SkipCounts,
    pub total: usize,
    pub groups: GroupedResults,
    /// Set when nothing qualified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<&'static str>,
}

impl From<ScanReport> for GroupedReport {
    fn from(report: ScanReport) -> Self {
        let groups = group_results(&report.results);
        Self {
            started_at: report.started_at,
            elapsed_ms: report.elapsed_ms,
            timeframes: report.timeframes,
            symbols_scanned: report.symbols_scanned,
            pairs_evaluated: report.pairs_evaluated,
            skipped: report.skipped,
            total: groups.len(),
            notice: groups.is_empty().then_some(EMPTY_NOTICE),
            groups,
        }
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "Symbol")]
    symbol: String,
    #[tabled(rename = "Timeframe")]
    timeframe: String,
    #[tabled(rename = "Setup")]
    setup: String,
    #[tabled(rename = "Trend")]
    trend: String,
}

impl From<&ScanResult> for ResultRow {
    fn from(r: &ScanResult) -> Self {
        Self {
            symbol: r.symbol.clone(),
            timeframe: r.timeframe.to_string(),
            setup: r.setup.to_string(),
            trend: r.trend.to_string(),
        }
    }
}

fn render_table(results: &[ScanResult]) -> String {
    let mut table = Table::new(results.iter().map(ResultRow::from));
    table.with(Style::modern());
    table.to_string()
}

/// Render non-empty groups as headed tables, or the empty notice.
pub fn render_groups(groups: &GroupedResults) -> String {
    if groups.is_empty() {
        return EMPTY_NOTICE.to_string();
    }

    let mut out = String::new();
    for (heading, rows) in [
        (UPTREND_HEADING, &groups.uptrend),
        (DOWNTREND_HEADING, &groups.downtrend),
        (CHOCH_HEADING, &groups.change_of_character),
    ] {
        if rows.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        let _ = writeln!(out, "### {heading}");
        let _ = writeln!(out, "{}", render_table(rows));
    }
    out
}
