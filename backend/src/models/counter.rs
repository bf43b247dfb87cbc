//! The "Pet the Cat" button counter.

use serde::{Deserialize, Serialize};

/// Click counter behind the "Pet the Cat" button.
///
/// Starts at zero and grows by exactly one per click.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PetCounter {
    count: u64,
}

impl PetCounter {
    pub fn new() -> Self {
        Self { count: 0 }
    }

    /// Resume from a stored count.
    pub fn from_count(count: u64) -> Self {
        Self { count }
    }

    /// Register one click and return the new count.
    pub fn click(&mut self) -> u64 {
        self.count = self.count.saturating_add(1);
        self.count
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    /// Button text shown for the current count.
    pub fn label(&self) -> String {
        format!("Pet the Cat ({} pets)", self.count)
    }
}
