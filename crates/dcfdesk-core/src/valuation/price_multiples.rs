use serde::{Deserialize, Serialize};
use time::Date;

use crate::domain::iso_date;
use crate::{PriceHistory, ValuationError};

const MIN_ABS_EPS: f64 = 1e-12;

/// Dated scalar in a chartable series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DatedValue {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub value: f64,
}

/// One row of the P/L and dividend-yield table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultiplesRow {
    #[serde(with = "iso_date")]
    pub date: Date,
    pub price_to_earnings: f64,
    pub dividend_yield_pct: f64,
}

/// Daily close divided by trailing EPS.
///
/// A single trailing EPS figure is applied across the whole history, so the
/// series tracks price moves against today's earnings.
pub fn price_to_earnings(
    history: &PriceHistory,
    trailing_eps: Option<f64>,
) -> Result<Vec<DatedValue>, ValuationError> {
    let eps = checked_eps(trailing_eps)?;
    Ok(history
        .points()
        .iter()
        .map(|point| DatedValue {
            date: point.date,
            value: point.close / eps,
        })
        .collect())
}

/// Dividend paid that day over the close, in percent. Days without a
/// positive close are skipped.
pub fn dividend_yield(history: &PriceHistory) -> Vec<DatedValue> {
    history
        .points()
        .iter()
        .filter(|point| point.close > 0.0)
        .map(|point| DatedValue {
            date: point.date,
            value: point.dividend / point.close * 100.0,
        })
        .collect()
}

/// Join P/L and dividend yield per day, dropping days where either is undefined.
pub fn multiples_table(
    history: &PriceHistory,
    trailing_eps: Option<f64>,
) -> Result<Vec<MultiplesRow>, ValuationError> {
    let eps = checked_eps(trailing_eps)?;
    Ok(history
        .points()
        .iter()
        .filter(|point| point.close > 0.0)
        .map(|point| MultiplesRow {
            date: point.date,
            price_to_earnings: point.close / eps,
            dividend_yield_pct: point.dividend / point.close * 100.0,
        })
        .filter(|row| row.price_to_earnings.is_finite() && row.dividend_yield_pct.is_finite())
        .collect())
}

fn checked_eps(trailing_eps: Option<f64>) -> Result<f64, ValuationError> {
    let eps = trailing_eps.ok_or(ValuationError::MissingData {
        field: "trailing_eps",
    })?;
    if !eps.is_finite() {
        return Err(ValuationError::invalid_input("trailing EPS must be finite"));
    }
    if eps.abs() < MIN_ABS_EPS {
        return Err(ValuationError::degenerate(
            "trailing EPS is zero; price-to-earnings is undefined",
        ));
    }
    Ok(eps)
}
