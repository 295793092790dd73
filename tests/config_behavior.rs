//! Behavior-driven tests for configuration
//!
//! These tests verify how default assumptions and per-ticker discount rates
//! are layered and validated before any valuation runs.

use std::io::Write;

use dcfdesk_core::{
    AssumptionOverrides, ConfigError, HistoryRange, LogLevel, Symbol, ValuationConfig,
    ValuationError,
};
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(contents.as_bytes()).expect("write config");
    file
}

#[test]
fn toml_file_overrides_defaults_and_extends_discount_rates() {
    // Given: A config file that changes the horizon and adds a ticker
    let file = write_config(
        r#"
default_horizon = 10
history_range = "2y"
log_level = "info"

[discount_rates]
"MGLU3.SA" = 11.0
"LREN3.SA" = 12.25
"#,
    );

    // When: It is loaded
    let config = ValuationConfig::from_file(file.path()).expect("valid file");

    // Then: File values win, everything else keeps its default
    assert_eq!(config.default_horizon, 10);
    assert_eq!(config.default_growth_pct, 5.0);
    assert_eq!(config.history_range, HistoryRange::TwoYears);
    assert_eq!(config.log_level, LogLevel::Info);
    // And: The discount table is replaced by the file's table
    assert_eq!(config.discount_rates.len(), 2);
    assert_eq!(
        config.discount_rate_for(&Symbol::parse("lren3.sa").expect("valid")),
        12.25
    );
    config.validate().expect("valid config");
}

#[test]
fn per_ticker_rate_takes_precedence_over_the_default() {
    let config = ValuationConfig::default();

    let bhia = config
        .assumptions_for(
            &Symbol::parse("BHIA3.SA").expect("valid"),
            AssumptionOverrides::default(),
        )
        .expect("valid");
    let unknown = config
        .assumptions_for(
            &Symbol::parse("VALE3.SA").expect("valid"),
            AssumptionOverrides::default(),
        )
        .expect("valid");

    assert_eq!(bhia.discount_rate_pct, 11.3);
    assert_eq!(unknown.discount_rate_pct, 10.55);
    assert_eq!(unknown.perpetual_growth_rate_pct, 5.0);
    assert_eq!(unknown.horizon_periods, 5);
}

#[test]
fn zero_horizon_is_rejected() {
    let file = write_config("default_horizon = 0\n");
    let config = ValuationConfig::from_file(file.path()).expect("parses");

    let error = config.validate().expect_err("zero horizon");
    assert!(matches!(error, ConfigError::Invalid(_)));
    assert!(error.to_string().contains("default_horizon"));
}

#[test]
fn default_discount_not_above_growth_is_rejected() {
    let config = ValuationConfig::from_toml_str(
        "default_growth_pct = 6.0\ndefault_discount_pct = 6.0\n",
    )
    .expect("parses");

    assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
}

#[test]
fn invalid_ticker_in_discount_table_fails_to_parse() {
    let error = ValuationConfig::from_toml_str("[discount_rates]\n\"3ABC\" = 9.0\n")
        .expect_err("ticker must start with a letter");
    assert!(matches!(error, ConfigError::Parse(_)));
}

#[test]
fn missing_file_is_a_file_error() {
    let dir = tempfile::tempdir().expect("temp dir");
    let error = ValuationConfig::from_file(&dir.path().join("absent.toml")).expect_err("missing");
    assert!(matches!(error, ConfigError::File(_)));
}

#[test]
fn override_that_breaks_the_model_is_a_valuation_error() {
    let config = ValuationConfig::default();

    let error = config
        .assumptions_for(
            &Symbol::parse("MGLU3.SA").expect("valid"),
            AssumptionOverrides {
                growth_pct: Some(10.5),
                ..AssumptionOverrides::default()
            },
        )
        .expect_err("growth equals the ticker's discount rate");

    assert!(matches!(error, ValuationError::InvalidInput { .. }));
}

#[test]
fn loading_leaves_validation_to_the_caller() {
    // Given: An environment that sets an unusable timeout
    let env = |name: &str| (name == "DCFDESK_TIMEOUT_MS").then(|| String::from("0"));

    // When: Config is loaded without a file
    let mut config = ValuationConfig::load_with(None, env).expect("loads");

    // Then: The value is kept so a later override can still replace it
    assert_eq!(config.timeout_ms, 0);
    assert!(config.validate().is_err());
    config.timeout_ms = 900;
    config.validate().expect("valid after override");
}
