use serde::Serialize;

use dcfdesk_core::{MultipleValuation, Symbol, ValuationService};

use crate::cli::MultipleArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct MultipleResponseData {
    symbol: Symbol,
    valuation: Option<MultipleValuation>,
}

pub async fn run(
    args: &MultipleArgs,
    service: &ValuationService,
) -> Result<CommandResult, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;

    let fetched = service.multiple(&symbol, args.multiple).await;
    let negative_cap = fetched
        .as_ref()
        .ok()
        .and_then(|outcome| outcome.valuation.as_ref().ok())
        .is_some_and(|valuation| valuation.market_cap < 0.0);

    let result = CommandResult::from_outcome(service.source_id(), fetched, |valuation| {
        MultipleResponseData {
            symbol: symbol.clone(),
            valuation,
        }
    })?;

    if negative_cap {
        return Ok(result.with_warning("long-term debt exceeds enterprise value plus cash"));
    }
    Ok(result)
}
