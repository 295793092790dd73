use serde::{Deserialize, Serialize};

use crate::{FinancialSnapshot, ValuationError};

/// Inputs to an EV/EBITDA valuation, all for the same reporting period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultipleInputs {
    pub market_multiple: f64,
    pub ebitda: Option<f64>,
    pub long_term_debt: Option<f64>,
    pub cash: Option<f64>,
}

impl MultipleInputs {
    pub fn from_snapshot(market_multiple: f64, snapshot: &FinancialSnapshot) -> Self {
        Self {
            market_multiple,
            ebitda: snapshot.ebitda,
            long_term_debt: snapshot.long_term_debt,
            cash: snapshot.cash,
        }
    }
}

/// Multiple-based estimate, echoing the statement figures it used.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultipleValuation {
    pub market_multiple: f64,
    pub ebitda: f64,
    pub long_term_debt: f64,
    pub cash: f64,
    pub enterprise_value: f64,
    pub market_cap: f64,
}

/// `EV = multiple * EBITDA`, `market cap = EV - long-term debt + cash`.
pub fn value_company_multiple(inputs: &MultipleInputs) -> Result<MultipleValuation, ValuationError> {
    let ebitda = required("ebitda", inputs.ebitda)?;
    let long_term_debt = required("long_term_debt", inputs.long_term_debt)?;
    let cash = required("cash", inputs.cash)?;

    if !inputs.market_multiple.is_finite() || inputs.market_multiple < 0.0 {
        return Err(ValuationError::invalid_input(format!(
            "market multiple must be a non-negative number, got {}",
            inputs.market_multiple
        )));
    }
    for (field, value) in [
        ("ebitda", ebitda),
        ("long_term_debt", long_term_debt),
        ("cash", cash),
    ] {
        if !value.is_finite() {
            return Err(ValuationError::invalid_input(format!("{field} must be finite")));
        }
    }

    let enterprise_value = inputs.market_multiple * ebitda;
    Ok(MultipleValuation {
        market_multiple: inputs.market_multiple,
        ebitda,
        long_term_debt,
        cash,
        enterprise_value,
        market_cap: enterprise_value - long_term_debt + cash,
    })
}

fn required(field: &'static str, value: Option<f64>) -> Result<f64, ValuationError> {
    value.ok_or(ValuationError::MissingData { field })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> MultipleInputs {
        MultipleInputs {
            market_multiple: 8.0,
            ebitda: Some(50.0),
            long_term_debt: Some(20.0),
            cash: Some(5.0),
        }
    }

    #[test]
    fn derives_enterprise_value_and_market_cap() {
        let valuation = value_company_multiple(&inputs()).expect("values");
        assert_eq!(valuation.enterprise_value, 400.0);
        assert_eq!(valuation.market_cap, 385.0);
    }

    #[test]
    fn missing_ebitda_is_reported_by_name() {
        let err = value_company_multiple(&MultipleInputs {
            ebitda: None,
            ..inputs()
        })
        .expect_err("must fail");
        assert_eq!(err, ValuationError::MissingData { field: "ebitda" });
    }

    #[test]
    fn missing_cash_is_reported_by_name() {
        let err = value_company_multiple(&MultipleInputs {
            cash: None,
            ..inputs()
        })
        .expect_err("must fail");
        assert_eq!(err, ValuationError::MissingData { field: "cash" });
    }

    #[test]
    fn negative_multiple_is_invalid() {
        let err = value_company_multiple(&MultipleInputs {
            market_multiple: -1.0,
            ..inputs()
        })
        .expect_err("must fail");
        assert!(matches!(err, ValuationError::InvalidInput { .. }));
    }

    #[test]
    fn zero_multiple_leaves_net_cash() {
        let valuation = value_company_multiple(&MultipleInputs {
            market_multiple: 0.0,
            ..inputs()
        })
        .expect("values");
        assert_eq!(valuation.enterprise_value, 0.0);
        assert_eq!(valuation.market_cap, -15.0);
    }

    #[test]
    fn builds_from_snapshot() {
        let snapshot = FinancialSnapshot::new(None, Some(10.0), None, Some(1.0)).expect("valid");
        let inputs = MultipleInputs::from_snapshot(6.5, &snapshot);
        assert_eq!(inputs.ebitda, Some(10.0));
        assert_eq!(inputs.long_term_debt, None);
        assert_eq!(inputs.market_multiple, 6.5);
    }
}
