use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::domain::iso_date;
use crate::{CashFlowSeries, ValuationError};

/// One synthetic future cash flow.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProjectedCashFlow {
    /// 1 for the first period after the last actual observation.
    pub period: u32,
    /// Year-end the projected flow is attributed to.
    #[serde(with = "iso_date")]
    pub date: Date,
    pub amount: f64,
}

/// Projected cash flows ordered from nearest to farthest period.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectedSeries {
    points: Vec<ProjectedCashFlow>,
}

impl ProjectedSeries {
    pub fn points(&self) -> &[ProjectedCashFlow] {
        &self.points
    }

    pub fn amounts(&self) -> Vec<f64> {
        self.points.iter().map(|point| point.amount).collect()
    }

    pub fn last(&self) -> Option<&ProjectedCashFlow> {
        self.points.last()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Compound the latest actual cash flow forward `periods` times at
/// `growth_rate_pct` percent per period.
///
/// Negative growth is allowed and models decline. The i-th projected flow
/// is dated Dec 31 of the year `i` years after the seed observation.
///
/// # Errors
///
/// [`ValuationError::InvalidInput`] when the series is empty, `periods` is
/// zero, the rate is not finite, or compounding overflows.
pub fn project(
    series: &CashFlowSeries,
    growth_rate_pct: f64,
    periods: usize,
) -> Result<ProjectedSeries, ValuationError> {
    let seed = series.last().ok_or_else(|| {
        ValuationError::invalid_input("cash flow series is empty; nothing to project from")
    })?;
    if periods == 0 {
        return Err(ValuationError::invalid_input(
            "projection horizon must be at least one period",
        ));
    }
    if !growth_rate_pct.is_finite() {
        return Err(ValuationError::invalid_input("growth rate must be finite"));
    }

    let growth_factor = 1.0 + growth_rate_pct / 100.0;
    let mut previous = seed.amount;
    let mut points = Vec::with_capacity(periods);

    for index in 1..=periods {
        let period = u32::try_from(index)
            .map_err(|_| ValuationError::invalid_input("projection horizon is too long"))?;
        let next = previous * growth_factor;
        if !next.is_finite() {
            return Err(ValuationError::invalid_input(format!(
                "projection overflowed at period {period}"
            )));
        }

        points.push(ProjectedCashFlow {
            period,
            date: year_end_after(seed.date, period)?,
            amount: next,
        });
        previous = next;
    }

    Ok(ProjectedSeries { points })
}

fn year_end_after(anchor: Date, years: u32) -> Result<Date, ValuationError> {
    i32::try_from(years)
        .ok()
        .and_then(|years| anchor.year().checked_add(years))
        .and_then(|year| Date::from_calendar_date(year, Month::December, 31).ok())
        .ok_or_else(|| ValuationError::invalid_input("projection runs past the calendar range"))
}
