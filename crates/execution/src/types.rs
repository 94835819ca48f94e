// In crates/execution/src/types.rs

use crate::Ledger;
use std::sync::Arc;
use tokio::sync::Mutex;

/// A ledger shared by every trading task. Hold the lock for one `apply` only.
pub type SharedLedger = Arc<Mutex<Box<dyn Ledger + Send>>>;

pub fn shared(ledger: impl Ledger + Send + 'static) -> SharedLedger {
    Arc::new(Mutex::new(Box::new(ledger)))
}
