//! Configuration management with validation and defaults
//!
//! Bet limits, game rules and house-edge parameters live here so they can be
//! tuned and tested without touching resolver code.

use crate::errors::{CasinoResult, ConfigurationError};
use crate::games::paytable::PlinkoTable;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

/// Complete engine configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CasinoConfig {
    pub betting: BettingConfig,
    pub dice: DiceConfig,
    pub crash: CrashConfig,
    pub blackjack: BlackjackConfig,
    pub plinko: PlinkoConfig,
    pub monitoring: MonitoringConfig,
}

/// Wager bounds shared by every game
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BettingConfig {
    pub min_bet: Decimal,
    pub max_bet: Decimal,
    pub max_roulette_bets: usize,
}

impl Default for BettingConfig {
    fn default() -> Self {
        Self {
            min_bet: Decimal::new(1, 2),
            max_bet: Decimal::new(10_000, 0),
            max_roulette_bets: 20,
        }
    }
}

/// Dice rules. Targets must lie strictly inside `(target_low, target_high)`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiceConfig {
    pub target_low: u8,
    pub target_high: u8,
    /// Multiplier numerator; `99` gives a 1% house edge over a 1..=100 roll
    pub house_numerator: u32,
}

impl Default for DiceConfig {
    fn default() -> Self {
        Self {
            target_low: 0,
            target_high: 99,
            house_numerator: 99,
        }
    }
}

/// Crash curve and crash-point distribution
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CrashConfig {
    pub house_edge: f64,
    /// Exponent of the growth curve `m(t) = e^(rate * t_ms)`
    pub growth_rate_per_ms: f64,
    pub max_crash_point: Decimal,
    pub min_auto_cashout: Decimal,
    pub sweep_interval_ms: u64,
}

impl Default for CrashConfig {
    fn default() -> Self {
        Self {
            house_edge: 0.01,
            growth_rate_per_ms: 0.00006,
            max_crash_point: Decimal::new(10_000, 0),
            min_auto_cashout: Decimal::new(101, 2),
            sweep_interval_ms: 1000,
        }
    }
}

/// Blackjack table rules
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BlackjackConfig {
    /// Winnings ratio for a natural, `1.5` is 3:2
    pub blackjack_payout: Decimal,
    pub dealer_stands_on: u8,
    pub dealer_hits_soft_17: bool,
    pub allow_double: bool,
    pub push_on_dealer_natural: bool,
    /// Idle rounds older than this are auto-stood on the next touch
    pub round_ttl_secs: u64,
}

impl Default for BlackjackConfig {
    fn default() -> Self {
        Self {
            blackjack_payout: Decimal::new(15, 1),
            dealer_stands_on: 17,
            dealer_hits_soft_17: false,
            allow_double: true,
            push_on_dealer_natural: false,
            round_ttl_secs: 3600,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlinkoConfig {
    pub min_rows: u8,
    pub max_rows: u8,
}

impl Default for PlinkoConfig {
    fn default() -> Self {
        Self {
            min_rows: PlinkoTable::MIN_ROWS,
            max_rows: PlinkoTable::MAX_ROWS,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enable_logging: bool,
    pub log_level: LogLevel,
    pub log_format: LogFormat,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_logging: true,
            log_level: LogLevel::Info,
            log_format: LogFormat::Full,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "error" => Ok(LogLevel::Error),
            "warn" => Ok(LogLevel::Warn),
            "info" => Ok(LogLevel::Info),
            "debug" => Ok(LogLevel::Debug),
            "trace" => Ok(LogLevel::Trace),
            other => Err(ConfigurationError::InvalidValue {
                field: "monitoring.log_level".to_string(),
                value: other.to_string(),
                reason: "expected error|warn|info|debug|trace".to_string(),
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Full,
    Compact,
}

/// Configuration loader with environment variable support
#[derive(Default)]
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables, then validate
    pub fn load(&self) -> CasinoResult<CasinoConfig> {
        let mut config = match self.config_path {
            Some(ref path) => self.load_from_file(path)?,
            None => CasinoConfig::default(),
        };

        self.apply_env_overrides(&mut config)?;
        validate(&config)?;

        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> CasinoResult<CasinoConfig> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)).into()
        })
    }

    fn apply_env_overrides(&self, config: &mut CasinoConfig) -> CasinoResult<()> {
        if let Ok(value) = env::var("CASINO_MIN_BET") {
            config.betting.min_bet = parse_env("CASINO_MIN_BET", value)?;
        }
        if let Ok(value) = env::var("CASINO_MAX_BET") {
            config.betting.max_bet = parse_env("CASINO_MAX_BET", value)?;
        }
        if let Ok(value) = env::var("CASINO_CRASH_HOUSE_EDGE") {
            config.crash.house_edge = parse_env("CASINO_CRASH_HOUSE_EDGE", value)?;
        }
        if let Ok(value) = env::var("CASINO_LOG_LEVEL") {
            config.monitoring.log_level = value.parse()?;
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, config: &CasinoConfig, path: &str) -> CasinoResult<()> {
        let toml_string = toml::to_string_pretty(config).map_err(|e| {
            ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e))
        })?;

        std::fs::write(path, toml_string).map_err(|e| {
            ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)).into()
        })
    }
}

fn parse_env<T: std::str::FromStr>(field: &str, value: String) -> Result<T, ConfigurationError> {
    value.parse().map_err(|_| ConfigurationError::InvalidValue {
        field: field.to_string(),
        value,
        reason: "could not parse".to_string(),
    })
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Validate configuration values
pub fn validate(config: &CasinoConfig) -> Result<(), ConfigurationError> {
    let betting = &config.betting;
    if betting.min_bet <= Decimal::ZERO {
        return Err(invalid("betting.min_bet", betting.min_bet, "must be positive"));
    }
    if betting.min_bet >= betting.max_bet {
        return Err(invalid(
            "betting.max_bet",
            betting.max_bet,
            "must be greater than betting.min_bet",
        ));
    }
    if betting.max_roulette_bets == 0 {
        return Err(invalid("betting.max_roulette_bets", 0, "cannot be zero"));
    }

    let dice = &config.dice;
    if dice.target_high > 100 || dice.target_high <= dice.target_low.saturating_add(1) {
        return Err(invalid(
            "dice.target_high",
            dice.target_high,
            "bounds must leave at least one legal target within 1..=99",
        ));
    }
    if dice.house_numerator == 0 || dice.house_numerator > 100 {
        return Err(invalid("dice.house_numerator", dice.house_numerator, "must be in 1..=100"));
    }

    let crash = &config.crash;
    if !(0.0..0.5).contains(&crash.house_edge) {
        return Err(invalid("crash.house_edge", crash.house_edge, "must be in [0, 0.5)"));
    }
    if crash.growth_rate_per_ms <= 0.0 || !crash.growth_rate_per_ms.is_finite() {
        return Err(invalid(
            "crash.growth_rate_per_ms",
            crash.growth_rate_per_ms,
            "must be a positive finite number",
        ));
    }
    if crash.max_crash_point <= Decimal::ONE {
        return Err(invalid("crash.max_crash_point", crash.max_crash_point, "must exceed 1"));
    }
    if crash.min_auto_cashout <= Decimal::ONE {
        return Err(invalid("crash.min_auto_cashout", crash.min_auto_cashout, "must exceed 1"));
    }
    if crash.sweep_interval_ms == 0 {
        return Err(invalid("crash.sweep_interval_ms", 0, "cannot be zero"));
    }

    let blackjack = &config.blackjack;
    if !(12..=21).contains(&blackjack.dealer_stands_on) {
        return Err(invalid(
            "blackjack.dealer_stands_on",
            blackjack.dealer_stands_on,
            "must be in 12..=21",
        ));
    }
    if blackjack.blackjack_payout < Decimal::ONE {
        return Err(invalid(
            "blackjack.blackjack_payout",
            blackjack.blackjack_payout,
            "a natural must pay at least even money",
        ));
    }

    let plinko = &config.plinko;
    if plinko.min_rows < PlinkoTable::MIN_ROWS
        || plinko.max_rows > PlinkoTable::MAX_ROWS
        || plinko.min_rows > plinko.max_rows
    {
        return Err(invalid(
            "plinko.max_rows",
            format!("{}..={}", plinko.min_rows, plinko.max_rows),
            "rows must fall within the published tables (8..=16)",
        ));
    }

    Ok(())
}
