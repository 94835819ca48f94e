// In crates/app-config/src/types.rs

use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::BTreeMap;
use strategies::MACrossoverSettings;

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Settings {
    /// The application's general settings.
    #[serde(default)]
    pub app: AppSettings,
    /// Settings for the Binance API.
    #[serde(default)]
    pub binance: BinanceSettings,
    /// Where the trade log lives.
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub trading: TradingSettings,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppSettings {
    /// Default filter directive when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Directory for the daily rolling log files.
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_dir: default_log_dir(),
        }
    }
}

#[derive(Deserialize, Clone, Default)]
pub struct BinanceSettings {
    /// The API key for Binance.
    #[serde(default)]
    pub api_key: String,
    /// The secret key for Binance.
    #[serde(default)]
    pub secret_key: String,
    /// The REST API base URL for Binance.
    #[serde(default = "default_rest_base_url")]
    pub rest_base_url: String,
}

impl BinanceSettings {
    pub fn has_credentials(&self) -> bool {
        !self.api_key.is_empty() && !self.secret_key.is_empty()
    }
}

// Credentials never end up in logs.
impl std::fmt::Debug for BinanceSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinanceSettings")
            .field("api_key", &redact(&self.api_key))
            .field("secret_key", &redact(&self.secret_key))
            .field("rest_base_url", &self.rest_base_url)
            .finish()
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct DatabaseSettings {
    /// Path of the SQLite trade log file.
    #[serde(default = "default_database_path")]
    pub path: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

/// Whether trades touch a real account.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    #[default]
    Simulated,
    Live,
}

/// Where closing prices come from.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MarketDataKind {
    #[default]
    Binance,
    Synthetic,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TradingSettings {
    #[serde(default)]
    pub mode: TradingMode,
    #[serde(default)]
    pub market_data: MarketDataKind,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_seconds: u64,
    /// Attempts per fetch, including the first one.
    #[serde(default = "default_fetch_retries")]
    pub fetch_retries: u32,
    #[serde(default = "default_fetch_retry_delay")]
    pub fetch_retry_delay_seconds: u64,
    /// Extra closes kept beyond the long window.
    #[serde(default = "default_window_margin")]
    pub window_margin: usize,
    /// Starting balance book for simulated mode.
    #[serde(default = "default_initial_balances")]
    pub initial_balances: BTreeMap<String, Decimal>,
    #[serde(default)]
    pub synthetic: SyntheticSettings,
    #[serde(default = "default_pairs")]
    pub pairs: Vec<PairConfig>,
}

impl Default for TradingSettings {
    fn default() -> Self {
        Self {
            mode: TradingMode::default(),
            market_data: MarketDataKind::default(),
            poll_interval_seconds: default_poll_interval(),
            fetch_retries: default_fetch_retries(),
            fetch_retry_delay_seconds: default_fetch_retry_delay(),
            window_margin: default_window_margin(),
            initial_balances: default_initial_balances(),
            synthetic: SyntheticSettings::default(),
            pairs: default_pairs(),
        }
    }
}

impl TradingSettings {
    pub fn enabled_pairs(&self) -> impl Iterator<Item = &PairConfig> {
        self.pairs.iter().filter(|p| p.enabled)
    }
}

/// Parameters of the offline random-walk market.
#[derive(Deserialize, Debug, Clone)]
pub struct SyntheticSettings {
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_start_price")]
    pub start_price: Decimal,
    /// Standard deviation of one candle's price step.
    #[serde(default = "default_step_sigma")]
    pub step_sigma: Decimal,
}

impl Default for SyntheticSettings {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            start_price: default_start_price(),
            step_sigma: default_step_sigma(),
        }
    }
}

/// Configuration for a single trading pair.
#[derive(Deserialize, Debug, Clone)]
pub struct PairConfig {
    pub symbol: String,
    #[serde(default = "default_interval")]
    pub interval: String,
    #[serde(default = "default_strategy")]
    pub strategy: String,
    #[serde(default = "default_short_window")]
    pub short_window: usize,
    #[serde(default = "default_long_window")]
    pub long_window: usize,
    #[serde(default = "default_trade_quantity")]
    pub trade_quantity: Decimal,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl PairConfig {
    pub fn strategy_settings(&self) -> MACrossoverSettings {
        MACrossoverSettings {
            short_window: self.short_window,
            long_window: self.long_window,
        }
    }
}

impl Default for PairConfig {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".to_string(),
            interval: default_interval(),
            strategy: default_strategy(),
            short_window: default_short_window(),
            long_window: default_long_window(),
            trade_quantity: default_trade_quantity(),
            enabled: default_enabled(),
        }
    }
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() { "<unset>" } else { "<redacted>" }
}

/// Helper functions for serde defaults
fn default_log_level() -> String { "info".to_string() }
fn default_log_dir() -> String { "logs".to_string() }
fn default_rest_base_url() -> String { "https://api.binance.com".to_string() }
fn default_database_path() -> String { "data/trades.db".to_string() }
fn default_poll_interval() -> u64 { 60 }
fn default_fetch_retries() -> u32 { 3 }
fn default_fetch_retry_delay() -> u64 { 5 }
fn default_window_margin() -> usize { 10 }
fn default_initial_balances() -> BTreeMap<String, Decimal> {
    BTreeMap::from([("USDT".to_string(), Decimal::from(10_000))])
}
fn default_seed() -> u64 { 42 }
fn default_start_price() -> Decimal { Decimal::from(30_000) }
fn default_step_sigma() -> Decimal { Decimal::from(150) }
fn default_pairs() -> Vec<PairConfig> { vec![PairConfig::default()] }
fn default_interval() -> String { "1h".to_string() }
fn default_strategy() -> String { "ma_crossover".to_string() }
fn default_short_window() -> usize { 20 }
fn default_long_window() -> usize { 50 }
fn default_trade_quantity() -> Decimal { Decimal::new(1, 3) }
fn default_enabled() -> bool { true }
