//! # dcfdesk Core
//!
//! Company valuation by discounted cash flow and market multiples.
//!
//! ## Overview
//!
//! - **Valuation engine**: pure calculators for FCF projection, present
//!   value, Gordon terminal value, EV/EBITDA and price multiples
//! - **Domain models** for cash-flow series, price history and statement
//!   snapshots
//! - **Data sources**: Yahoo Finance adapter and an in-memory source
//! - **Response envelope** with metadata and structured errors
//! - **Configuration** for default assumptions and per-ticker discount rates
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Provider adapters (Yahoo, static) |
//! | [`circuit_breaker`] | Circuit breaker for upstream calls |
//! | [`config`] | TOML/env configuration |
//! | [`data_source`] | Provider trait and fetched inputs |
//! | [`domain`] | Domain models |
//! | [`envelope`] | Response envelope with metadata |
//! | [`error`] | Core error types |
//! | [`http_client`] | HTTP client abstraction |
//! | [`service`] | Provider + calculator orchestration |
//! | [`source`] | Provider identifiers |
//! | [`valuation`] | Valuation calculators |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use dcfdesk_core::{AssumptionOverrides, Symbol, ValuationConfig, ValuationService, YahooAdapter};
//!
//! let service = ValuationService::new(Arc::new(YahooAdapter::default()), ValuationConfig::default());
//! let outcome = service
//!     .dcf(&Symbol::parse("MGLU3.SA")?, AssumptionOverrides::default())
//!     .await?;
//! println!("{:?}", outcome.valuation?.enterprise_value_total);
//! ```

pub mod adapters;
pub mod circuit_breaker;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod http_client;
pub mod service;
pub mod source;
pub mod valuation;

pub use adapters::{StaticDataset, StaticSource, YahooAdapter, YahooAuthManager};
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use config::{AssumptionOverrides, ConfigError, LogLevel, TickerRate, ValuationConfig};
pub use data_source::{
    fetch_valuation_inputs, FundamentalsSource, HealthState, HealthStatus, SourceError,
    SourceErrorKind, SourceFuture, ValuationInputs,
};
pub use domain::{
    CashFlowPoint, CashFlowSeries, FinancialSnapshot, HistoryRange, PriceHistory, PricePoint,
    Symbol, UtcDateTime,
};
pub use envelope::{Envelope, EnvelopeError, EnvelopeMeta};
pub use error::{ValidationError, ValuationError};
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse, NoopHttpClient,
    ReqwestHttpClient,
};
pub use service::{CashFlowProjection, MultiplesReport, ServiceOutcome, ValuationService};
pub use source::ProviderId;
pub use valuation::{
    cash_flow_report, multiples_table, present_value, project, terminal_value,
    value_company_dcf, value_company_multiple, CashFlowKind, CashFlowRow, DcfValuation,
    GrowthAssumptions, MultipleInputs, MultipleValuation, MultiplesRow, ProjectedSeries,
};
