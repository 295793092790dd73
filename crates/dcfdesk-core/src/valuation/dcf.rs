use serde::{Deserialize, Serialize};

use crate::valuation::{discount, projection, ProjectedSeries};
use crate::{CashFlowPoint, CashFlowSeries, ValuationError};

/// Scalar assumptions for one DCF run. Rates are percentages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthAssumptions {
    pub perpetual_growth_rate_pct: f64,
    pub horizon_periods: usize,
    pub discount_rate_pct: f64,
}

impl GrowthAssumptions {
    pub fn new(
        perpetual_growth_rate_pct: f64,
        horizon_periods: usize,
        discount_rate_pct: f64,
    ) -> Result<Self, ValuationError> {
        let assumptions = Self {
            perpetual_growth_rate_pct,
            horizon_periods,
            discount_rate_pct,
        };
        assumptions.validate()?;
        Ok(assumptions)
    }

    /// Checks finiteness, a positive horizon and `discount > growth`.
    pub fn validate(&self) -> Result<(), ValuationError> {
        if !self.perpetual_growth_rate_pct.is_finite() || !self.discount_rate_pct.is_finite() {
            return Err(ValuationError::invalid_input(
                "growth and discount rates must be finite",
            ));
        }
        if self.horizon_periods == 0 {
            return Err(ValuationError::invalid_input(
                "projection horizon must be at least one period",
            ));
        }
        if self.discount_rate_pct <= self.perpetual_growth_rate_pct {
            return Err(ValuationError::invalid_input(format!(
                "discount rate {}% must exceed perpetual growth rate {}%",
                self.discount_rate_pct, self.perpetual_growth_rate_pct
            )));
        }
        Ok(())
    }
}

/// DCF estimate with the pieces it was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfValuation {
    pub assumptions: GrowthAssumptions,
    /// Latest actual observation; seeds the projection and the terminal value.
    pub anchor: CashFlowPoint,
    pub projected: ProjectedSeries,
    pub present_value_of_projection: f64,
    pub terminal_value: f64,
    pub enterprise_value_total: f64,
}

/// Project, discount and add the Gordon terminal value.
///
/// Projection seed and terminal-value base are the same latest actual
/// observation, never a projected one.
pub fn value_company_dcf(
    series: &CashFlowSeries,
    assumptions: &GrowthAssumptions,
) -> Result<DcfValuation, ValuationError> {
    assumptions.validate()?;
    let anchor = *series.last().ok_or_else(|| {
        ValuationError::invalid_input("cash flow series is empty; nothing to value")
    })?;

    let projected = projection::project(
        series,
        assumptions.perpetual_growth_rate_pct,
        assumptions.horizon_periods,
    )?;
    let present_value_of_projection =
        discount::present_value(&projected, assumptions.discount_rate_pct)?;
    let terminal_value = discount::terminal_value(
        anchor.amount,
        assumptions.perpetual_growth_rate_pct,
        assumptions.discount_rate_pct,
    )?;

    Ok(DcfValuation {
        assumptions: *assumptions,
        anchor,
        projected,
        present_value_of_projection,
        terminal_value,
        enterprise_value_total: present_value_of_projection + terminal_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use time::macros::date;

    fn series() -> CashFlowSeries {
        CashFlowSeries::new(vec![
            CashFlowPoint::new(date!(2021 - 12 - 31), 100.0).unwrap(),
            CashFlowPoint::new(date!(2022 - 12 - 31), 110.0).unwrap(),
            CashFlowPoint::new(date!(2023 - 12 - 31), 121.0).unwrap(),
        ])
        .unwrap()
    }

    #[test]
    fn single_flat_period_discounts_latest_flow_once() {
        let assumptions = GrowthAssumptions::new(0.0, 1, 10.0).expect("valid");
        let valuation = value_company_dcf(&series(), &assumptions).expect("values");

        assert_relative_eq!(valuation.present_value_of_projection, 121.0 / 1.10, max_relative = 1e-12);
        assert_relative_eq!(valuation.terminal_value, 121.0 / 0.10, max_relative = 1e-12);
    }

    #[test]
    fn total_is_present_value_plus_terminal_value() {
        let assumptions = GrowthAssumptions::new(5.0, 5, 10.55).expect("valid");
        let valuation = value_company_dcf(&series(), &assumptions).expect("values");

        assert_eq!(valuation.projected.len(), 5);
        assert_eq!(valuation.anchor.amount, 121.0);
        assert_relative_eq!(
            valuation.enterprise_value_total,
            valuation.present_value_of_projection + valuation.terminal_value
        );
        assert_relative_eq!(
            valuation.terminal_value,
            121.0 * 1.05 / (0.1055 - 0.05),
            max_relative = 1e-12
        );
    }

    #[test]
    fn rejects_discount_not_above_growth() {
        let err = GrowthAssumptions::new(8.0, 5, 8.0).expect_err("must fail");
        assert!(matches!(err, ValuationError::InvalidInput { .. }));

        let raw = GrowthAssumptions {
            perpetual_growth_rate_pct: 12.0,
            horizon_periods: 3,
            discount_rate_pct: 9.0,
        };
        let err = value_company_dcf(&series(), &raw).expect_err("must fail");
        assert!(matches!(err, ValuationError::InvalidInput { .. }));
    }

    #[test]
    fn rejects_zero_horizon() {
        let err = GrowthAssumptions::new(2.0, 0, 9.0).expect_err("must fail");
        assert!(matches!(err, ValuationError::InvalidInput { .. }));
    }

    #[test]
    fn empty_series_cannot_be_valued() {
        let assumptions = GrowthAssumptions::new(2.0, 3, 9.0).expect("valid");
        let err = value_company_dcf(&CashFlowSeries::default(), &assumptions).expect_err("must fail");
        assert!(matches!(err, ValuationError::InvalidInput { .. }));
    }
}
