//! Tunables of a sensor bank

use crate::debounce::DEFAULT_DEBOUNCE_MS;

/// Settings applied when a [`SensorBank`](crate::bank::SensorBank) is built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BankSettings {
    /// How long a line must hold still before its level is validated
    pub debounce_ms: u32,
}

impl Default for BankSettings {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl BankSettings {
    pub const fn with_debounce_ms(mut self, debounce_ms: u32) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }
}
