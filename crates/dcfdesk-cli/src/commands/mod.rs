mod cashflow;
mod dcf;
mod multiple;
mod multiples;
mod tickers;

use std::sync::Arc;

use dcfdesk_core::{
    Envelope, EnvelopeError, ProviderId, ReqwestHttpClient, ServiceOutcome, SourceError,
    ValuationConfig, ValuationService, YahooAdapter,
};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::metadata::Metadata;

pub const SCHEMA_VERSION: &str = "v1.0.0";

pub struct CommandResult {
    pub data: Value,
    pub warnings: Vec<String>,
    pub errors: Vec<EnvelopeError>,
    pub latency_ms: u64,
    pub source_chain: Vec<ProviderId>,
}

impl CommandResult {
    pub fn ok(data: Value, source_chain: Vec<ProviderId>) -> Self {
        Self {
            data,
            warnings: Vec::new(),
            errors: Vec::new(),
            latency_ms: 0,
            source_chain,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warnings.push(warning.into());
        self
    }

    pub fn with_errors(mut self, errors: Vec<EnvelopeError>) -> Self {
        self.errors.extend(errors);
        self
    }

    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Shape a service call into data plus envelope errors.
    ///
    /// `into_data` receives `None` when the provider or the calculator
    /// failed, so every command keeps a stable data shape.
    pub fn from_outcome<T, D, F>(
        source: ProviderId,
        fetched: Result<ServiceOutcome<T>, SourceError>,
        into_data: F,
    ) -> Result<Self, CliError>
    where
        D: Serialize,
        F: FnOnce(Option<T>) -> D,
    {
        match fetched {
            Ok(outcome) => {
                let latency_ms = outcome.latency_ms;
                let (value, errors) = match outcome.valuation {
                    Ok(value) => (Some(value), Vec::new()),
                    Err(error) => {
                        warn!(symbol = %outcome.symbol, code = error.code(), "valuation failed: {error}");
                        (None, vec![EnvelopeError::from(&error)])
                    }
                };
                let data = serde_json::to_value(into_data(value))?;
                Ok(Self::ok(data, vec![outcome.source])
                    .with_errors(errors)
                    .with_latency(latency_ms))
            }
            Err(error) => {
                warn!(source = %source, code = error.code(), "provider failed: {}", error.message());
                let data = serde_json::to_value(into_data(None))?;
                Ok(Self::ok(data, vec![source])
                    .with_errors(vec![EnvelopeError::from_source(&error, source)]))
            }
        }
    }
}

/// Defaults, config file, environment, then command-line flags.
pub fn load_config(cli: &Cli) -> Result<ValuationConfig, CliError> {
    load_config_with(cli, |name| std::env::var(name).ok())
}

/// File and environment first, then flags, then a single validation pass.
fn load_config_with<F>(cli: &Cli, env: F) -> Result<ValuationConfig, CliError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ValuationConfig::load_with(cli.config.as_deref(), env)?;
    if cli.offline {
        config.offline = true;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.timeout_ms = timeout_ms;
    }
    if let Some(log_level) = cli.log_level {
        config.log_level = log_level;
    }
    config.validate()?;
    Ok(config)
}

pub fn build_service(config: ValuationConfig) -> Result<ValuationService, CliError> {
    let adapter = if config.offline {
        YahooAdapter::default()
    } else {
        YahooAdapter::from_env(Arc::new(ReqwestHttpClient::new()?))
    }
    .with_timeout_ms(config.timeout_ms);

    Ok(ValuationService::new(Arc::new(adapter), config))
}

pub async fn run(cli: &Cli, service: &ValuationService) -> Result<Envelope<Value>, CliError> {
    let command_result = match &cli.command {
        Command::Dcf(args) => dcf::run(args, service).await?,
        Command::Cashflow(args) => cashflow::run(args, service).await?,
        Command::Multiple(args) => multiple::run(args, service).await?,
        Command::Multiples(args) => multiples::run(args, service).await?,
        Command::Tickers => tickers::run(service)?,
    };

    let CommandResult {
        data,
        warnings,
        errors,
        latency_ms,
        source_chain,
    } = command_result;

    let mut metadata = Metadata::new(source_chain, latency_ms)?;
    for warning in warnings {
        metadata.push_warning(warning);
    }
    let meta = metadata.into_envelope_meta(SCHEMA_VERSION)?;

    Envelope::with_errors(meta, data, errors).map_err(CliError::from)
}
