//! Valuation defaults and per-ticker discount rates.
//!
//! Layering: built-in defaults, then a TOML file, then `DCFDESK_*`
//! environment variables. The CLI applies its own flags last and calls
//! [`ValuationConfig::validate`] on the merged result.
//!
//! ```toml
//! default_growth_pct = 5.0
//! default_horizon = 5
//! default_discount_pct = 10.55
//! history_range = "5y"
//!
//! [discount_rates]
//! "MGLU3.SA" = 10.5
//! ```

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::valuation::GrowthAssumptions;
use crate::{HistoryRange, Symbol, ValidationError, ValuationError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file error: {0}")]
    File(String),

    #[error("invalid TOML configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("environment variable {name}: {reason}")]
    Env { name: &'static str, reason: String },

    #[error("invalid log level '{0}', expected one of trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_filter_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(ConfigError::InvalidLogLevel(value.to_owned())),
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_filter_str())
    }
}

/// Per-call replacements for configured assumptions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AssumptionOverrides {
    pub growth_pct: Option<f64>,
    pub horizon: Option<usize>,
    pub discount_pct: Option<f64>,
}

/// A configured ticker and the discount rate (WACC) it is valued at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerRate {
    pub symbol: Symbol,
    pub discount_rate_pct: f64,
}

/// Valuation defaults. Rates are percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValuationConfig {
    pub default_growth_pct: f64,
    pub default_horizon: usize,
    /// Used for tickers without an entry in `discount_rates`.
    pub default_discount_pct: f64,
    pub discount_rates: BTreeMap<Symbol, f64>,
    pub history_range: HistoryRange,
    pub timeout_ms: u64,
    pub log_level: LogLevel,
    /// Serve deterministic local data instead of calling Yahoo.
    pub offline: bool,
}

impl Default for ValuationConfig {
    fn default() -> Self {
        let discount_rates = [
            ("MGLU3.SA", 10.5),
            ("NTCO3.SA", 8.7),
            ("PCAR3.SA", 9.2),
            ("BHIA3.SA", 11.3),
        ]
        .into_iter()
        .filter_map(|(ticker, rate)| Symbol::parse(ticker).ok().map(|symbol| (symbol, rate)))
        .collect();

        Self {
            default_growth_pct: 5.0,
            default_horizon: 5,
            default_discount_pct: 10.55,
            discount_rates,
            history_range: HistoryRange::FiveYears,
            timeout_ms: 10_000,
            log_level: LogLevel::Warn,
            offline: false,
        }
    }
}

impl ValuationConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(input)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::File(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&contents)
    }

    /// Defaults, then `path` if given, then the process environment.
    /// The result is not validated; callers apply their own overrides and
    /// then call [`ValuationConfig::validate`].
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with(path, |name| std::env::var(name).ok())
    }

    /// Like [`ValuationConfig::load`], reading `DCFDESK_*` through `lookup`.
    pub fn load_with<F>(path: Option<&Path>, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_with(lookup)?;
        Ok(config)
    }

    /// Apply `DCFDESK_*` overrides read through `lookup`.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("DCFDESK_DEFAULT_GROWTH") {
            self.default_growth_pct = parse_env("DCFDESK_DEFAULT_GROWTH", &value)?;
        }
        if let Some(value) = lookup("DCFDESK_DEFAULT_HORIZON") {
            self.default_horizon = parse_env("DCFDESK_DEFAULT_HORIZON", &value)?;
        }
        if let Some(value) = lookup("DCFDESK_DEFAULT_DISCOUNT") {
            self.default_discount_pct = parse_env("DCFDESK_DEFAULT_DISCOUNT", &value)?;
        }
        if let Some(value) = lookup("DCFDESK_HISTORY_RANGE") {
            self.history_range = value.parse()?;
        }
        if let Some(value) = lookup("DCFDESK_TIMEOUT_MS") {
            self.timeout_ms = parse_env("DCFDESK_TIMEOUT_MS", &value)?;
        }
        if let Some(value) = lookup("DCFDESK_LOG_LEVEL") {
            self.log_level = value.parse()?;
        }
        if let Some(value) = lookup("DCFDESK_OFFLINE") {
            self.offline = parse_env_bool("DCFDESK_OFFLINE", &value)?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let rates = std::iter::once(("default_discount_pct", self.default_discount_pct))
            .chain(self.discount_rates.values().map(|rate| ("discount_rates", *rate)));

        if !self.default_growth_pct.is_finite() {
            return Err(ConfigError::Invalid(String::from(
                "default_growth_pct must be finite",
            )));
        }
        if self.default_horizon == 0 {
            return Err(ConfigError::Invalid(String::from(
                "default_horizon must be at least 1",
            )));
        }
        if self.timeout_ms == 0 {
            return Err(ConfigError::Invalid(String::from(
                "timeout_ms must be greater than zero",
            )));
        }
        for (field, rate) in rates {
            if !rate.is_finite() || rate <= self.default_growth_pct {
                return Err(ConfigError::Invalid(format!(
                    "{field} {rate}% must be finite and exceed default_growth_pct {}%",
                    self.default_growth_pct
                )));
            }
        }
        Ok(())
    }

    /// Configured rate for `symbol`, else the default.
    pub fn discount_rate_for(&self, symbol: &Symbol) -> f64 {
        self.discount_rates
            .get(symbol)
            .copied()
            .unwrap_or(self.default_discount_pct)
    }

    /// Resolve assumptions: override, then per-ticker rate, then default.
    pub fn assumptions_for(
        &self,
        symbol: &Symbol,
        overrides: AssumptionOverrides,
    ) -> Result<GrowthAssumptions, ValuationError> {
        GrowthAssumptions::new(
            overrides.growth_pct.unwrap_or(self.default_growth_pct),
            overrides.horizon.unwrap_or(self.default_horizon),
            overrides
                .discount_pct
                .unwrap_or_else(|| self.discount_rate_for(symbol)),
        )
    }

    pub fn tickers(&self) -> Vec<TickerRate> {
        self.discount_rates
            .iter()
            .map(|(symbol, rate)| TickerRate {
                symbol: symbol.clone(),
                discount_rate_pct: *rate,
            })
            .collect()
    }
}

fn parse_env<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Env {
        name,
        reason: e.to_string(),
    })
}

fn parse_env_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::Env {
            name,
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}
