// =============================================================================
// Configuration — command line flags, environment and validation
// =============================================================================
//
// Everything is checked once at startup. A `Config` that exists is valid:
// the lookback interval covers the fixed recent window, every period is
// positive and the symbol list is non-empty with no duplicates.
// =============================================================================

use std::path::PathBuf;
use std::time::Duration;

use chrono::{Days, NaiveDate};
use clap::Parser;

use crate::error::ConfigError;
use crate::indicators::avg_rate::RECENT_WINDOW;
use crate::types::Symbol;

/// Environment variable holding the Tiingo API token.
pub const TOKEN_ENV: &str = "TIINGO_TOKEN";

/// Serve a rolling rate-of-change chart for a set of ticker symbols.
#[derive(Debug, Clone, Parser)]
#[command(name = "avg-rate", version)]
pub struct Cli {
    /// Number of years to display.
    #[arg(short = 'p', long, default_value_t = 20)]
    pub period: u32,

    /// Number of days to look back prior to and average over.
    #[arg(short = 'i', long, default_value_t = 365)]
    pub interval: usize,

    /// Number of hours between updates.
    #[arg(short = 'u', long = "update-frequency", default_value_t = 4)]
    pub update_frequency: u32,

    /// Ticker symbol(s); repeat the flag for more than one.
    #[arg(short = 's', long = "symbol", default_values_t = default_symbols())]
    pub symbols: Vec<String>,

    /// Address the HTTP server listens on.
    #[arg(long, env = "AVG_RATE_BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind: String,

    /// Also write every successfully rendered chart to this file.
    #[arg(long = "write-svg")]
    pub write_svg: Option<PathBuf>,
}

fn default_symbols() -> Vec<String> {
    vec!["dia".to_string(), "spy".to_string(), "vt".to_string()]
}

/// Validated runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub period_years: u32,
    pub lookback: usize,
    pub update_every: Duration,
    pub symbols: Vec<Symbol>,
    pub bind_addr: String,
    pub write_svg: Option<PathBuf>,
    pub token: String,
}

impl Config {
    /// Validate parsed flags and pair them with the API token.
    pub fn from_cli(cli: Cli, token: Option<String>) -> Result<Self, ConfigError> {
        let token = token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingToken(TOKEN_ENV))?;

        if cli.interval < RECENT_WINDOW {
            return Err(ConfigError::IntervalTooShort {
                got: cli.interval,
                min: RECENT_WINDOW,
            });
        }
        if cli.period == 0 {
            return Err(ConfigError::NotPositive {
                name: "period",
                got: cli.period,
            });
        }
        if cli.update_frequency == 0 {
            return Err(ConfigError::NotPositive {
                name: "update-frequency",
                got: cli.update_frequency,
            });
        }

        Ok(Self {
            period_years: cli.period,
            lookback: cli.interval,
            update_every: Duration::from_secs(u64::from(cli.update_frequency) * 3600),
            symbols: normalize_symbols(&cli.symbols)?,
            bind_addr: cli.bind,
            write_svg: cli.write_svg,
            token,
        })
    }

    /// Parse the process arguments and read the token from the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_cli(Cli::parse(), std::env::var(TOKEN_ENV).ok())
    }

    /// Calendar days of history requested per run: the displayed period
    /// plus enough leading data to fill the first lookback window.
    pub fn history_days(&self) -> u64 {
        u64::from(self.period_years) * 365 + self.lookback as u64
    }
}

/// Normalize symbols, keeping configured order.
pub fn normalize_symbols(raw: &[String]) -> Result<Vec<Symbol>, ConfigError> {
    if raw.is_empty() {
        return Err(ConfigError::NoSymbols);
    }
    let mut symbols: Vec<Symbol> = Vec::with_capacity(raw.len());
    for r in raw {
        let symbol = Symbol::new(r);
        if symbol.is_empty() {
            return Err(ConfigError::EmptySymbol(r.clone()));
        }
        if symbols.contains(&symbol) {
            return Err(ConfigError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }
    Ok(symbols)
}

/// Half-open request range ending at `today`.
pub fn date_range(today: NaiveDate, history_days: u64) -> (NaiveDate, NaiveDate) {
    let from = today
        .checked_sub_days(Days::new(history_days))
        .unwrap_or(NaiveDate::MIN);
    (from, today)
}
