//! Provider contract and the single-fetch boundary for valuation inputs.
//!
//! # Datasets
//!
//! | Method | Response | Used by |
//! |--------|----------|---------|
//! | [`cash_flow`](FundamentalsSource::cash_flow) | [`CashFlowSeries`] | DCF, cash-flow report |
//! | [`price_history`](FundamentalsSource::price_history) | [`PriceHistory`] | P/L, dividend yield |
//! | [`trailing_eps`](FundamentalsSource::trailing_eps) | `Option<f64>` | P/L |
//! | [`financial_snapshot`](FundamentalsSource::financial_snapshot) | [`FinancialSnapshot`] | EV/EBITDA |
//!
//! [`fetch_valuation_inputs`] calls each method exactly once and hands the
//! result to the pure calculators in [`crate::valuation`].

use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    CashFlowSeries, FinancialSnapshot, HistoryRange, PriceHistory, ProviderId, Symbol,
};

/// Boxed future returned by [`FundamentalsSource`] methods.
pub type SourceFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, SourceError>> + Send + 'a>>;

/// Health state reported by a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Runtime source health snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub state: HealthState,
    pub rate_available: bool,
}

impl HealthStatus {
    pub const fn new(state: HealthState, rate_available: bool) -> Self {
        Self {
            state,
            rate_available,
        }
    }

    pub const fn healthy() -> Self {
        Self::new(HealthState::Healthy, true)
    }
}

/// Adapter-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceErrorKind {
    Unavailable,
    RateLimited,
    InvalidRequest,
    NotFound,
    Internal,
}

/// Structured provider error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    kind: SourceErrorKind,
    message: String,
    retryable: bool,
}

impl SourceError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Unavailable,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::RateLimited,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::InvalidRequest,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::NotFound,
            message: message.into(),
            retryable: false,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: SourceErrorKind::Internal,
            message: message.into(),
            retryable: false,
        }
    }

    pub const fn kind(&self) -> SourceErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn retryable(&self) -> bool {
        self.retryable
    }

    pub const fn code(&self) -> &'static str {
        match self.kind {
            SourceErrorKind::Unavailable => "source.unavailable",
            SourceErrorKind::RateLimited => "source.rate_limited",
            SourceErrorKind::InvalidRequest => "source.invalid_request",
            SourceErrorKind::NotFound => "source.not_found",
            SourceErrorKind::Internal => "source.internal",
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl std::error::Error for SourceError {}

/// Financial-data provider contract.
///
/// Implementations must be `Send + Sync`; the CLI shares one behind an `Arc`.
/// A source returns an empty series or `None` when it has no data for a
/// field. Whether that is fatal is the calculator's call, not the source's.
pub trait FundamentalsSource: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Annual free cash flow, oldest first.
    fn cash_flow<'a>(&'a self, symbol: &'a Symbol) -> SourceFuture<'a, CashFlowSeries>;

    /// Daily closes with dividends over `range`.
    fn price_history<'a>(
        &'a self,
        symbol: &'a Symbol,
        range: HistoryRange,
    ) -> SourceFuture<'a, PriceHistory>;

    /// Trailing twelve-month earnings per share.
    fn trailing_eps<'a>(&'a self, symbol: &'a Symbol) -> SourceFuture<'a, Option<f64>>;

    /// EBITDA, long-term debt and cash for the latest reported period.
    fn financial_snapshot<'a>(&'a self, symbol: &'a Symbol) -> SourceFuture<'a, FinancialSnapshot>;

    fn health<'a>(&'a self) -> Pin<Box<dyn Future<Output = HealthStatus> + Send + 'a>>;
}

/// Everything the valuation views need for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationInputs {
    pub symbol: Symbol,
    pub source: ProviderId,
    pub cash_flow: CashFlowSeries,
    pub price_history: PriceHistory,
    pub trailing_eps: Option<f64>,
    pub financials: FinancialSnapshot,
    /// Wall-clock time spent fetching, in milliseconds.
    pub latency_ms: u64,
}

/// Fetch every dataset for `symbol` exactly once.
pub async fn fetch_valuation_inputs(
    source: &dyn FundamentalsSource,
    symbol: &Symbol,
    range: HistoryRange,
) -> Result<ValuationInputs, SourceError> {
    let started = Instant::now();

    let cash_flow = source.cash_flow(symbol).await?;
    let price_history = source.price_history(symbol, range).await?;
    let trailing_eps = source.trailing_eps(symbol).await?;
    let financials = source.financial_snapshot(symbol).await?;

    let latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    debug!(
        symbol = %symbol,
        source = %source.id(),
        cash_flow_points = cash_flow.len(),
        price_points = price_history.len(),
        latency_ms,
        "fetched valuation inputs"
    );

    Ok(ValuationInputs {
        symbol: symbol.clone(),
        source: source.id(),
        cash_flow,
        price_history,
        trailing_eps,
        financials,
        latency_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_follow_kind() {
        assert_eq!(SourceError::not_found("x").code(), "source.not_found");
        assert_eq!(SourceError::rate_limited("x").code(), "source.rate_limited");
        assert!(SourceError::unavailable("x").retryable());
        assert!(!SourceError::invalid_request("x").retryable());
    }

    #[test]
    fn display_includes_code() {
        let error = SourceError::internal("bad payload");
        assert_eq!(error.to_string(), "bad payload (source.internal)");
    }
}
