use crate::valuation::ProjectedSeries;
use crate::ValuationError;

/// Spread between discount and growth rate (as fractions) below which the
/// Gordon denominator is treated as zero.
pub const DEGENERATE_SPREAD: f64 = 1e-12;

/// Present value of a projected series at `discount_rate_pct` percent.
///
/// The first projected flow is discounted one full period.
pub fn present_value(
    projected: &ProjectedSeries,
    discount_rate_pct: f64,
) -> Result<f64, ValuationError> {
    discount_cash_flows(&projected.amounts(), discount_rate_pct)
}

/// `Σ flows[i-1] / (1 + r)^i` for `i = 1..=n`, with `r = discount_rate_pct / 100`.
pub fn discount_cash_flows(flows: &[f64], discount_rate_pct: f64) -> Result<f64, ValuationError> {
    if !discount_rate_pct.is_finite() {
        return Err(ValuationError::invalid_input("discount rate must be finite"));
    }
    if discount_rate_pct <= -100.0 {
        return Err(ValuationError::invalid_input(format!(
            "discount rate {discount_rate_pct}% leaves a non-positive discount base"
        )));
    }

    let base = 1.0 + discount_rate_pct / 100.0;
    let mut factor = 1.0;
    let mut total = 0.0;
    for flow in flows {
        factor *= base;
        total += flow / factor;
    }

    if !total.is_finite() {
        return Err(ValuationError::degenerate(
            "present value is not finite; discount factor underflowed",
        ));
    }
    Ok(total)
}

/// Gordon growth terminal value: `last * (1 + g) / (r - g)`.
///
/// Both rates are percentages and are converted to fractions the same way.
/// The value is not discounted back to today.
///
/// # Errors
///
/// - [`ValuationError::ArithmeticDegenerate`] when `r` and `g` coincide.
/// - [`ValuationError::InvalidInput`] when `r < g` or any input is not finite.
pub fn terminal_value(
    last_actual_cash_flow: f64,
    perpetual_growth_rate_pct: f64,
    discount_rate_pct: f64,
) -> Result<f64, ValuationError> {
    if !last_actual_cash_flow.is_finite() {
        return Err(ValuationError::invalid_input("last cash flow must be finite"));
    }
    if !perpetual_growth_rate_pct.is_finite() || !discount_rate_pct.is_finite() {
        return Err(ValuationError::invalid_input(
            "growth and discount rates must be finite",
        ));
    }

    let growth = perpetual_growth_rate_pct / 100.0;
    let discount = discount_rate_pct / 100.0;
    let spread = discount - growth;

    if spread.abs() < DEGENERATE_SPREAD {
        return Err(ValuationError::degenerate(format!(
            "discount rate {discount_rate_pct}% equals perpetual growth rate; terminal value diverges"
        )));
    }
    if spread < 0.0 {
        return Err(ValuationError::invalid_input(format!(
            "discount rate {discount_rate_pct}% must exceed perpetual growth rate {perpetual_growth_rate_pct}%"
        )));
    }

    Ok(last_actual_cash_flow * (1.0 + growth) / spread)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn discounts_first_flow_one_full_period() {
        let value = discount_cash_flows(&[110.0], 10.0).expect("valid");
        assert_relative_eq!(value, 100.0, max_relative = 1e-12);
    }

    #[test]
    fn sums_discounted_flows() {
        let value = discount_cash_flows(&[110.0, 121.0], 10.0).expect("valid");
        assert_relative_eq!(value, 200.0, max_relative = 1e-12);
    }

    #[test]
    fn zero_rate_is_plain_sum() {
        let value = discount_cash_flows(&[1.0, 2.0, 3.0], 0.0).expect("valid");
        assert_relative_eq!(value, 6.0);
    }

    #[test]
    fn empty_flows_are_worth_nothing() {
        assert_eq!(discount_cash_flows(&[], 8.0).expect("valid"), 0.0);
    }

    #[test]
    fn rejects_rate_at_or_below_minus_hundred() {
        for rate in [-100.0, -150.0] {
            let err = discount_cash_flows(&[1.0], rate).expect_err("must fail");
            assert!(matches!(err, ValuationError::InvalidInput { .. }));
        }
    }

    #[test]
    fn higher_discount_rate_lowers_present_value() {
        let flows = [50.0, 60.0, 70.0];
        let values = [0.0, 5.0, 10.55, 25.0]
            .iter()
            .map(|rate| discount_cash_flows(&flows, *rate).expect("valid"))
            .collect::<Vec<_>>();
        assert!(values.windows(2).all(|pair| pair[1] < pair[0]));
    }

    #[test]
    fn gordon_growth_uses_fractional_rates() {
        // 100 * 1.05 / (0.10 - 0.05)
        let value = terminal_value(100.0, 5.0, 10.0).expect("valid");
        assert_relative_eq!(value, 2_100.0, max_relative = 1e-12);
    }

    #[test]
    fn equal_rates_are_degenerate() {
        let err = terminal_value(100.0, 7.5, 7.5).expect_err("must fail");
        assert!(matches!(err, ValuationError::ArithmeticDegenerate { .. }));
    }

    #[test]
    fn growth_above_discount_is_invalid() {
        let err = terminal_value(100.0, 12.0, 10.0).expect_err("must fail");
        assert!(matches!(err, ValuationError::InvalidInput { .. }));
    }
}
