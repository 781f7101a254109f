//! Sources for the free-tier model ceiling.
//!
//! The ceiling is resolved on every check, never cached, so a changed value
//! applies to the next write without a restart.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::warn;

/// Environment variable consulted by [`EnvLimit::free_tier`].
pub const FREE_TIER_ENV: &str = "SPECREG_FREE_TIER_MODEL_COUNT";

/// Ceiling used when nothing else is configured.
pub const DEFAULT_FREE_TIER_MODEL_COUNT: u64 = 100;

/// Something that yields the current model ceiling.
pub trait LimitSource: Send + Sync {
    fn ceiling(&self) -> u64;
}

/// A fixed ceiling.
impl LimitSource for u64 {
    fn ceiling(&self) -> u64 {
        *self
    }
}

impl<L: LimitSource + ?Sized> LimitSource for Arc<L> {
    fn ceiling(&self) -> u64 {
        (**self).ceiling()
    }
}

/// A ceiling that can be swapped at runtime. Clones share the same value.
#[derive(Clone, Debug)]
pub struct SharedLimit {
    value: Arc<AtomicU64>,
}

impl SharedLimit {
    pub fn new(ceiling: u64) -> Self {
        Self {
            value: Arc::new(AtomicU64::new(ceiling)),
        }
    }

    /// Replace the ceiling. Takes effect on the next check.
    pub fn set(&self, ceiling: u64) {
        self.value.store(ceiling, Ordering::SeqCst);
    }
}

impl LimitSource for SharedLimit {
    fn ceiling(&self) -> u64 {
        self.value.load(Ordering::SeqCst)
    }
}

/// A ceiling read from an environment variable on every call.
///
/// Falls back to `fallback` when the variable is unset or not a
/// non-negative integer.
#[derive(Clone, Debug)]
pub struct EnvLimit {
    var: String,
    fallback: u64,
}

impl EnvLimit {
    /// Read [`FREE_TIER_ENV`], defaulting to `fallback`.
    pub fn free_tier(fallback: u64) -> Self {
        Self::with_var(FREE_TIER_ENV, fallback)
    }

    pub fn with_var(var: impl Into<String>, fallback: u64) -> Self {
        Self {
            var: var.into(),
            fallback,
        }
    }
}

impl LimitSource for EnvLimit {
    fn ceiling(&self) -> u64 {
        let Ok(raw) = std::env::var(&self.var) else {
            return self.fallback;
        };
        match raw.trim().parse() {
            Ok(ceiling) => ceiling,
            Err(_) => {
                warn!(var = %self.var, value = %raw, fallback = self.fallback, "ignoring unparsable quota limit");
                self.fallback
            }
        }
    }
}
