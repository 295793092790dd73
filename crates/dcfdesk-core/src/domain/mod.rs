//! # Domain Models
//!
//! Canonical inputs for the valuation engine.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Symbol`] | Validated ticker, exchange suffix included |
//! | [`CashFlowSeries`] | Annual free cash flow, ascending by date |
//! | [`PriceHistory`] | Daily close and dividend observations |
//! | [`FinancialSnapshot`] | EBITDA, long-term debt and cash for one period |
//! | [`HistoryRange`] | Lookback window for price history |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! Construction validates finiteness (and sign where it matters), and the
//! series types keep their points sorted so "last" always means "latest".

mod models;
mod symbol;
mod timestamp;

pub use models::{
    CashFlowPoint, CashFlowSeries, FinancialSnapshot, HistoryRange, PriceHistory, PricePoint,
};
pub use symbol::Symbol;
pub use timestamp::{iso_date, parse_date, UtcDateTime};
