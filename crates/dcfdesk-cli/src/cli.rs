//! CLI argument definitions for dcfdesk.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `dcf` | Discounted cash flow valuation |
//! | `cashflow` | Actual and projected free cash flow |
//! | `multiple` | EV/EBITDA valuation |
//! | `multiples` | Daily P/L and dividend yield |
//! | `tickers` | Configured tickers and discount rates |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--config` | none | TOML configuration file |
//! | `--offline` | `false` | Serve deterministic local data |
//! | `--timeout-ms` | from config | Provider request timeout |
//! | `--log-level` | from config | Log verbosity on stderr |
//!
//! # Examples
//!
//! ```bash
//! dcfdesk dcf MGLU3.SA --growth 4 --periods 10
//! dcfdesk cashflow NTCO3.SA --format table
//! dcfdesk multiple PCAR3.SA --multiple 7.5 --pretty
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use dcfdesk_core::LogLevel;

/// dcfdesk - company valuation from the terminal
///
/// Values listed companies by discounted cash flow and by market
/// multiples, using Yahoo Finance statements and prices.
#[derive(Debug, Parser)]
#[command(
    name = "dcfdesk",
    author,
    version,
    about = "Discounted cash flow and multiple valuations"
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// TOML file with default assumptions and per-ticker discount rates.
    #[arg(long, global = true, env = "DCFDESK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Use deterministic local data instead of calling Yahoo.
    #[arg(long, global = true, default_value_t = false)]
    pub offline: bool,

    /// Provider request timeout in milliseconds.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    /// Log verbosity (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[arg(long, global = true, value_parser = parse_log_level)]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned text for terminal display.
    Table,
    /// Single JSON object.
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Value a company by discounted free cash flow.
    ///
    ///   dcfdesk dcf MGLU3.SA
    ///   dcfdesk dcf MGLU3.SA --growth 3 --periods 10 --discount 12
    Dcf(DcfArgs),

    /// Show reported free cash flow followed by the projection.
    Cashflow(CashflowArgs),

    /// Value a company from an EV/EBITDA multiple.
    ///
    ///   dcfdesk multiple PCAR3.SA --multiple 8
    Multiple(MultipleArgs),

    /// Daily P/L and dividend yield over the configured history range.
    Multiples(MultiplesArgs),

    /// List configured tickers and their discount rates.
    Tickers,
}

#[derive(Debug, Args)]
pub struct DcfArgs {
    /// Ticker, exchange suffix included (e.g. MGLU3.SA).
    pub symbol: String,

    /// Perpetual growth rate in percent.
    #[arg(long, allow_negative_numbers = true)]
    pub growth: Option<f64>,

    /// Number of projected years.
    #[arg(long)]
    pub periods: Option<usize>,

    /// Discount rate (WACC) in percent; overrides the configured rate.
    #[arg(long, allow_negative_numbers = true)]
    pub discount: Option<f64>,
}

#[derive(Debug, Args)]
pub struct CashflowArgs {
    pub symbol: String,

    /// Growth rate in percent.
    #[arg(long, allow_negative_numbers = true)]
    pub growth: Option<f64>,

    /// Number of projected years.
    #[arg(long)]
    pub periods: Option<usize>,
}

#[derive(Debug, Args)]
pub struct MultipleArgs {
    pub symbol: String,

    /// Market EV/EBITDA multiple.
    #[arg(long)]
    pub multiple: f64,
}

#[derive(Debug, Args)]
pub struct MultiplesArgs {
    pub symbol: String,
}

fn parse_log_level(value: &str) -> Result<LogLevel, String> {
    value.parse().map_err(|error: dcfdesk_core::ConfigError| error.to_string())
}
