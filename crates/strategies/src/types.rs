// In crates/strategies/src/types.rs

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct MACrossoverSettings {
    /// Number of closes in the fast average.
    pub short_window: usize,
    /// Number of closes in the slow average.
    pub long_window: usize,
}

impl Default for MACrossoverSettings {
    fn default() -> Self {
        Self {
            short_window: 20,
            long_window: 50,
        }
    }
}
