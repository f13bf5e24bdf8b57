use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

/// Number of monitored signals observed so far.
///
/// Cloned handles share the same value. The count starts at zero and only
/// ever grows; there is no decrement or reset.
#[derive(Debug, Clone, Default)]
pub struct EscalationCounter(Arc<AtomicU32>);

impl EscalationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }

    /// Increment the count and return the new value.
    pub fn increment_and_load(&self) -> u32 {
        self.0.fetch_add(1, Ordering::SeqCst).saturating_add(1)
    }
}
