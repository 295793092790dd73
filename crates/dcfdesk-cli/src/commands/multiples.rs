use serde::Serialize;

use dcfdesk_core::{MultiplesReport, Symbol, ValuationService};

use crate::cli::MultiplesArgs;
use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct MultiplesResponseData {
    symbol: Symbol,
    #[serde(flatten)]
    report: Option<MultiplesReport>,
}

pub async fn run(
    args: &MultiplesArgs,
    service: &ValuationService,
) -> Result<CommandResult, CliError> {
    let symbol = Symbol::parse(&args.symbol)?;

    let fetched = service.multiples(&symbol).await;
    let empty = fetched
        .as_ref()
        .ok()
        .and_then(|outcome| outcome.valuation.as_ref().ok())
        .is_some_and(|report| report.rows.is_empty());

    let result = CommandResult::from_outcome(service.source_id(), fetched, |report| {
        MultiplesResponseData {
            symbol: symbol.clone(),
            report,
        }
    })?;

    if empty {
        return Ok(result.with_warning(format!(
            "no priced days in the {} history window",
            service.config().history_range
        )));
    }
    Ok(result)
}
