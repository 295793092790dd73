use serde::Serialize;

use dcfdesk_core::{AssumptionOverrides, CashFlowProjection, Symbol, ValuationService};

use crate::cli::CashflowArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct CashflowResponseData {
    symbol: Symbol,
    #[serde(flatten)]
    projection: Option<CashFlowProjection>,
}

pub async fn run(
    args: &CashflowArgs,
    service: &ValuationService,
) -> Result<CommandResult, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;
    let overrides = AssumptionOverrides {
        growth_pct: args.growth,
        horizon: args.periods,
        discount_pct: None,
    };

    let fetched = service.cash_flow(&symbol, overrides).await;
    CommandResult::from_outcome(service.source_id(), fetched, |projection| {
        CashflowResponseData {
            symbol: symbol.clone(),
            projection,
        }
    })
}
