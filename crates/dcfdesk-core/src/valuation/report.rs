use serde::{Deserialize, Serialize};
use time::Date;

use crate::domain::iso_date;
use crate::valuation::ProjectedSeries;
use crate::CashFlowSeries;

/// Whether a cash-flow row was reported or projected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CashFlowKind {
    Actual,
    Projected,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CashFlowRow {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub amount: f64,
    pub kind: CashFlowKind,
}

/// Actual rows in date order followed by the projection.
pub fn cash_flow_report(series: &CashFlowSeries, projected: &ProjectedSeries) -> Vec<CashFlowRow> {
    let actual = series.points().iter().map(|point| CashFlowRow {
        date: point.date,
        amount: point.amount,
        kind: CashFlowKind::Actual,
    });
    let future = projected.points().iter().map(|point| CashFlowRow {
        date: point.date,
        amount: point.amount,
        kind: CashFlowKind::Projected,
    });
    actual.chain(future).collect()
}
