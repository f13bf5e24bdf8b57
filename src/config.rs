//! Runtime settings for the signal trap.

use std::num::NonZeroU32;

/// Environment variable overriding [TrapConfig::tolerated_signals].
pub const TOLERATED_SIGNALS_ENV: &str = "TRAPDOOR_TOLERATED_SIGNALS";

/// Default number of signals absorbed before a forced exit.
pub const DEFAULT_TOLERATED_SIGNALS: NonZeroU32 = match NonZeroU32::new(3) {
    Some(value) => value,
    None => unreachable!(),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrapConfig {
    /// Signals counted before escalation kicks in. The first one triggers
    /// cleanup; the signal after the last tolerated one forces the exit.
    pub tolerated_signals: NonZeroU32,
}

impl Default for TrapConfig {
    fn default() -> Self {
        Self {
            tolerated_signals: DEFAULT_TOLERATED_SIGNALS,
        }
    }
}

impl TrapConfig {
    /// Read overrides from the environment, keeping defaults for anything
    /// missing or malformed.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = lookup(TOLERATED_SIGNALS_ENV) {
            match raw.trim().parse::<NonZeroU32>() {
                Ok(value) => config.tolerated_signals = value,
                Err(err) => tracing::warn!(
                    value = %raw,
                    default = DEFAULT_TOLERATED_SIGNALS.get(),
                    "ignoring invalid {TOLERATED_SIGNALS_ENV}: {err}"
                ),
            }
        }
        config
    }
}
