//! # Valuation Engine
//!
//! Pure, synchronous calculators. Nothing here performs I/O; callers fetch
//! provider data once and pass it in by reference.
//!
//! | Function | Result |
//! |----------|--------|
//! | [`project`] | Geometric growth projection from the latest actual flow |
//! | [`present_value`] | Discounted sum of a projection |
//! | [`terminal_value`] | Gordon growth perpetuity value |
//! | [`value_company_dcf`] | Projection + present value + terminal value |
//! | [`value_company_multiple`] | EV/EBITDA enterprise value and market cap |
//! | [`multiples_table`] | Daily P/L and dividend yield |
//! | [`cash_flow_report`] | Actual and projected rows for display |
//!
//! ## Units
//!
//! Every rate is a percentage (`5.0` is 5%). Each calculator divides by 100
//! once and uses the fraction in every formula, so growth and discount
//! rates are always compared on the same scale.

mod dcf;
mod discount;
mod multiple;
mod price_multiples;
mod projection;
mod report;

pub use dcf::{value_company_dcf, DcfValuation, GrowthAssumptions};
pub use discount::{discount_cash_flows, present_value, terminal_value, DEGENERATE_SPREAD};
pub use multiple::{value_company_multiple, MultipleInputs, MultipleValuation};
pub use price_multiples::{
    dividend_yield, multiples_table, price_to_earnings, DatedValue, MultiplesRow,
};
pub use projection::{project, ProjectedCashFlow, ProjectedSeries};
pub use report::{cash_flow_report, CashFlowKind, CashFlowRow};
