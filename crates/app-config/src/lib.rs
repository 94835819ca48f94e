// In crates/app-config/src/lib.rs

use config::{Config, Environment, File};
use core_types::Symbol;
use rust_decimal::Decimal;
use std::path::Path;

pub mod error;
pub mod types;

// Re-export the most important types for easy access.
pub use error::{Error, Result};
pub use types::{MarketDataKind, PairConfig, Settings, TradingMode};

/// Loads the application settings from `./config`.
///
/// The environment is read from `APP_ENVIRONMENT` and defaults to "development".
pub fn load_settings() -> Result<Settings> {
    let environment = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "development".into());
    load_settings_from(Path::new("config"), &environment)
}

/// Layered configuration loading:
/// 1. Built-in defaults.
/// 2. `<dir>/base.toml`, if present.
/// 3. `<dir>/<environment>.toml`, if present.
/// 4. Environment variables such as `APP__TRADING__MODE=live`.
///
/// The merged result is validated before it is returned.
pub fn load_settings_from(dir: &Path, environment: &str) -> Result<Settings> {
    let settings = Config::builder()
        .add_source(File::from(dir.join("base")).required(false))
        .add_source(File::from(dir.join(environment)).required(false))
        .add_source(
            Environment::with_prefix("APP")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let settings: Settings = settings.try_deserialize()?;
    validate(&settings)?;
    Ok(settings)
}

/// Checks the cross-field rules serde cannot express.
pub fn validate(settings: &Settings) -> Result<()> {
    let trading = &settings.trading;

    if trading.poll_interval_seconds < 1 {
        return Err(Error::Invalid("trading.poll_interval_seconds must be at least 1".into()));
    }
    if trading.fetch_retries < 1 {
        return Err(Error::Invalid("trading.fetch_retries must be at least 1".into()));
    }

    for (asset, amount) in &trading.initial_balances {
        if *amount < Decimal::ZERO {
            return Err(Error::Invalid(format!(
                "initial balance for {asset} is negative ({amount})"
            )));
        }
    }

    if trading.enabled_pairs().next().is_none() {
        return Err(Error::Invalid("no enabled trading pair configured".into()));
    }

    for pair in &trading.pairs {
        Symbol::new(&pair.symbol)
            .map_err(|e| Error::Invalid(format!("pair {}: {e}", pair.symbol)))?;

        if pair.short_window < 1 || pair.short_window >= pair.long_window {
            return Err(Error::Invalid(format!(
                "pair {}: need 1 <= short_window < long_window (got {} and {})",
                pair.symbol, pair.short_window, pair.long_window
            )));
        }
        if pair.trade_quantity <= Decimal::ZERO {
            return Err(Error::Invalid(format!(
                "pair {}: trade_quantity must be positive",
                pair.symbol
            )));
        }
        if pair.interval.trim().is_empty() {
            return Err(Error::Invalid(format!("pair {}: interval is empty", pair.symbol)));
        }
    }

    if trading.mode == TradingMode::Live && !settings.binance.has_credentials() {
        return Err(Error::Invalid(
            "live mode requires binance.api_key and binance.secret_key".into(),
        ));
    }
    if trading.mode == TradingMode::Live && trading.market_data == MarketDataKind::Synthetic {
        return Err(Error::Invalid(
            "live mode cannot trade on synthetic market data; set trading.market_data = \"binance\"".into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::fs;

    fn write(dir: &Path, name: &str, body: &str) {
        fs::write(dir.join(name), body).unwrap();
    }

    #[test]
    fn test_defaults_without_any_file() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from(dir.path(), "test").unwrap();

        assert_eq!(settings.trading.mode, TradingMode::Simulated);
        assert_eq!(settings.trading.poll_interval_seconds, 60);
        assert_eq!(settings.trading.fetch_retries, 3);
        assert_eq!(settings.trading.window_margin, 10);
        assert_eq!(settings.database.path, "data/trades.db");

        let pair = &settings.trading.pairs[0];
        assert_eq!(pair.symbol, "BTCUSDT");
        assert_eq!((pair.short_window, pair.long_window), (20, 50));
        assert_eq!(pair.trade_quantity, dec!(0.001));
    }

    #[test]
    fn test_environment_file_overrides_base() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "base.toml",
            r#"
[trading]
poll_interval_seconds = 30
market_data = "synthetic"

[[trading.pairs]]
symbol = "ETHUSDT"
short_window = 5
long_window = 15
trade_quantity = "0.05"
"#,
        );
        write(
            dir.path(),
            "staging.toml",
            r#"
[trading]
poll_interval_seconds = 10
"#,
        );

        let settings = load_settings_from(dir.path(), "staging").unwrap();
        assert_eq!(settings.trading.poll_interval_seconds, 10);
        assert_eq!(settings.trading.market_data, MarketDataKind::Synthetic);

        let pair = &settings.trading.pairs[0];
        assert_eq!(pair.symbol, "ETHUSDT");
        assert_eq!(pair.interval, "1h");
        assert_eq!(pair.trade_quantity, dec!(0.05));
        assert_eq!(pair.strategy_settings().long_window, 15);
    }

    #[test]
    fn test_rejects_inverted_windows() {
        let mut settings = Settings::default();
        settings.trading.pairs[0].short_window = 50;
        settings.trading.pairs[0].long_window = 20;
        assert!(matches!(validate(&settings), Err(Error::Invalid(_))));
    }

    #[test]
    fn test_rejects_live_without_credentials() {
        let mut settings = Settings::default();
        settings.trading.mode = TradingMode::Live;
        assert!(validate(&settings).is_err());

        settings.binance.api_key = "key".into();
        settings.binance.secret_key = "secret".into();
        assert!(validate(&settings).is_ok());
    }

    #[test]
    fn test_rejects_live_orders_on_synthetic_prices() {
        let mut settings = Settings::default();
        settings.trading.mode = TradingMode::Live;
        settings.trading.market_data = MarketDataKind::Synthetic;
        settings.binance.api_key = "key".into();
        settings.binance.secret_key = "secret".into();
        assert!(matches!(validate(&settings), Err(Error::Invalid(ref msg)) if msg.contains("synthetic")));

        settings.trading.mode = TradingMode::Simulated;
        assert!(validate(&settings).is_ok());
    }

    #[test]
    fn test_rejects_bad_pair_values() {
        let mut settings = Settings::default();
        settings.trading.pairs[0].trade_quantity = Decimal::ZERO;
        assert!(validate(&settings).is_err());

        let mut settings = Settings::default();
        settings.trading.pairs[0].symbol = "NOPE".into();
        assert!(validate(&settings).is_err());

        let mut settings = Settings::default();
        settings.trading.pairs[0].enabled = false;
        assert!(validate(&settings).is_err());

        let mut settings = Settings::default();
        settings.trading.initial_balances.insert("USDT".into(), dec!(-1));
        assert!(validate(&settings).is_err());
    }

    #[test]
    fn test_debug_redacts_credentials() {
        let mut settings = Settings::default();
        settings.binance.secret_key = "very-secret".into();
        let shown = format!("{:?}", settings.binance);
        assert!(!shown.contains("very-secret"));
        assert!(shown.contains("<redacted>"));
    }
}
