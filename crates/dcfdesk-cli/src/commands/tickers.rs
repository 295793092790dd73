use serde::Serialize;

use dcfdesk_core::{TickerRate, ValuationService};

use crate::error::CliError;

use super::CommandResult;

#[derive(Debug, Serialize)]
struct TickersResponseData {
    default_discount_pct: f64,
    default_growth_pct: f64,
    default_horizon: usize,
    tickers: Vec<TickerRate>,
}

pub fn run(service: &ValuationService) -> Result<CommandResult, CliError> {
    let config = service.config();
    let data = serde_json::to_value(TickersResponseData {
        default_discount_pct: config.default_discount_pct,
        default_growth_pct: config.default_growth_pct,
        default_horizon: config.default_horizon,
        tickers: config.tickers(),
    })?;

    Ok(CommandResult::ok(data, vec![service.source_id()]))
}
