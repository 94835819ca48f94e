use crate::error::{Error, Result};
use crate::{Strategy, ma_crossover::MACrossover, types::MACrossoverSettings};

/// Builds the strategy named in a pair's configuration.
pub fn create_strategy(
    name: &str,
    settings: MACrossoverSettings,
) -> Result<Box<dyn Strategy + Send + Sync>> {
    if settings.short_window == 0 || settings.short_window >= settings.long_window {
        return Err(Error::InvalidWindow {
            short: settings.short_window,
            long: settings.long_window,
        });
    }

    let strategy: Box<dyn Strategy + Send + Sync> = match name {
        "ma_crossover" => Box::new(MACrossover::new(settings)),
        unknown => return Err(Error::UnknownStrategy(unknown.to_string())),
    };
    Ok(strategy)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_strategy() {
        let strategy = create_strategy("ma_crossover", MACrossoverSettings::default()).unwrap();
        assert_eq!(strategy.name(), "ma_crossover");
    }

    #[test]
    fn test_unknown_strategy_and_bad_windows() {
        assert!(matches!(
            create_strategy("supertrend", MACrossoverSettings::default()),
            Err(Error::UnknownStrategy(name)) if name == "supertrend"
        ));
        let bad = MACrossoverSettings { short_window: 50, long_window: 20 };
        assert!(matches!(create_strategy("ma_crossover", bad), Err(Error::InvalidWindow { .. })));
    }
}
