use serde::Serialize;

use dcfdesk_core::{AssumptionOverrides, DcfValuation, Symbol, ValuationService};

use crate::cli::DcfArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct DcfResponseData {
    symbol: Symbol,
    valuation: Option<DcfValuation>,
}

pub async fn run(args: &DcfArgs, service: &ValuationService) -> Result<CommandResult, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;
    let overrides = AssumptionOverrides {
        growth_pct: args.growth,
        horizon: args.periods,
        discount_pct: args.discount,
    };

    let fetched = service.dcf(&symbol, overrides).await;
    let negative_anchor = fetched
        .as_ref()
        .ok()
        .and_then(|outcome| outcome.valuation.as_ref().ok())
        .is_some_and(|valuation| valuation.anchor.amount < 0.0);

    let result = CommandResult::from_outcome(service.source_id(), fetched, |valuation| {
        DcfResponseData {
            symbol: symbol.clone(),
            valuation,
        }
    })?;

    if negative_anchor {
        return Ok(result.with_warning(
            "latest free cash flow is negative; projection and terminal value are negative too",
        ));
    }
    Ok(result)
}
