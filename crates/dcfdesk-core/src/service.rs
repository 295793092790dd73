//! Binds a provider to the calculators.
//!
//! Each call resolves its assumptions, fetches only the datasets it needs
//! (once), and runs the pure calculator. Provider failures and valuation
//! failures stay separate so callers can report both precisely.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{AssumptionOverrides, ValuationConfig};
use crate::data_source::{fetch_valuation_inputs, FundamentalsSource, SourceError, ValuationInputs};
use crate::valuation::{
    cash_flow_report, multiples_table, project, value_company_dcf, value_company_multiple,
    CashFlowRow, DcfValuation, MultipleInputs, MultipleValuation, MultiplesRow,
};
use crate::{HistoryRange, ProviderId, Symbol, ValuationError};

/// Outcome of a service call whose provider fetch succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceOutcome<T> {
    pub symbol: Symbol,
    pub source: ProviderId,
    pub latency_ms: u64,
    pub valuation: Result<T, ValuationError>,
}

/// Actual cash flows followed by the projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CashFlowProjection {
    pub growth_rate_pct: f64,
    pub horizon_periods: usize,
    pub rows: Vec<CashFlowRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiplesReport {
    pub range: HistoryRange,
    pub trailing_eps: Option<f64>,
    pub rows: Vec<MultiplesRow>,
}

#[derive(Clone)]
pub struct ValuationService {
    source: Arc<dyn FundamentalsSource>,
    config: ValuationConfig,
}

impl ValuationService {
    pub fn new(source: Arc<dyn FundamentalsSource>, config: ValuationConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &ValuationConfig {
        &self.config
    }

    pub fn source_id(&self) -> ProviderId {
        self.source.id()
    }

    /// Every dataset for `symbol`, unvalued.
    pub async fn inputs(&self, symbol: &Symbol) -> Result<ValuationInputs, SourceError> {
        fetch_valuation_inputs(self.source.as_ref(), symbol, self.config.history_range).await
    }

    pub async fn dcf(
        &self,
        symbol: &Symbol,
        overrides: AssumptionOverrides,
    ) -> Result<ServiceOutcome<DcfValuation>, SourceError> {
        let assumptions = match self.config.assumptions_for(symbol, overrides) {
            Ok(assumptions) => assumptions,
            Err(error) => return Ok(self.rejected(symbol, error)),
        };

        let started = Instant::now();
        let series = self.source.cash_flow(symbol).await?;
        let valuation = value_company_dcf(&series, &assumptions);
        if let Ok(result) = &valuation {
            info!(
                symbol = %symbol,
                discount_rate_pct = assumptions.discount_rate_pct,
                enterprise_value_total = result.enterprise_value_total,
                "dcf valuation complete"
            );
        }
        Ok(self.outcome(symbol, started, valuation))
    }

    /// Projection only, so no discount rate is involved.
    pub async fn cash_flow(
        &self,
        symbol: &Symbol,
        overrides: AssumptionOverrides,
    ) -> Result<ServiceOutcome<CashFlowProjection>, SourceError> {
        let growth_rate_pct = overrides
            .growth_pct
            .unwrap_or(self.config.default_growth_pct);
        let horizon_periods = overrides.horizon.unwrap_or(self.config.default_horizon);

        let started = Instant::now();
        let series = self.source.cash_flow(symbol).await?;
        let valuation = project(&series, growth_rate_pct, horizon_periods).map(|projected| {
            CashFlowProjection {
                growth_rate_pct,
                horizon_periods,
                rows: cash_flow_report(&series, &projected),
            }
        });
        Ok(self.outcome(symbol, started, valuation))
    }

    pub async fn multiple(
        &self,
        symbol: &Symbol,
        market_multiple: f64,
    ) -> Result<ServiceOutcome<MultipleValuation>, SourceError> {
        let started = Instant::now();
        let snapshot = self.source.financial_snapshot(symbol).await?;
        let valuation =
            value_company_multiple(&MultipleInputs::from_snapshot(market_multiple, &snapshot));
        Ok(self.outcome(symbol, started, valuation))
    }

    pub async fn multiples(
        &self,
        symbol: &Symbol,
    ) -> Result<ServiceOutcome<MultiplesReport>, SourceError> {
        let range = self.config.history_range;
        let started = Instant::now();
        let history = self.source.price_history(symbol, range).await?;
        let trailing_eps = self.source.trailing_eps(symbol).await?;
        let valuation = multiples_table(&history, trailing_eps).map(|rows| MultiplesReport {
            range,
            trailing_eps,
            rows,
        });
        Ok(self.outcome(symbol, started, valuation))
    }

    fn outcome<T>(
        &self,
        symbol: &Symbol,
        started: Instant,
        valuation: Result<T, ValuationError>,
    ) -> ServiceOutcome<T> {
        ServiceOutcome {
            symbol: symbol.clone(),
            source: self.source.id(),
            latency_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            valuation,
        }
    }

    fn rejected<T>(&self, symbol: &Symbol, error: ValuationError) -> ServiceOutcome<T> {
        ServiceOutcome {
            symbol: symbol.clone(),
            source: self.source.id(),
            latency_ms: 0,
            valuation: Err(error),
        }
    }
}
