//! Scan engine: request pacing and the symbol × timeframe scan loop.

pub mod rate_limit;
pub mod scanner;
