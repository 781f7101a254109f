use std::fmt;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hybrid logical timestamp used to order writes.
///
/// Combines a physical wall-clock component with a logical counter so that
/// two writes landing in the same millisecond still have a strict order.
///
/// Ordering: `physical_ms` → `logical` (total order).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp {
    /// Wall-clock milliseconds since UNIX epoch.
    pub physical_ms: u64,
    /// Logical counter for writes at the same physical time.
    pub logical: u32,
}

impl Timestamp {
    pub fn new(physical_ms: u64, logical: u32) -> Self {
        Self {
            physical_ms,
            logical,
        }
    }

    /// The zero timestamp.
    pub const fn zero() -> Self {
        Self {
            physical_ms: 0,
            logical: 0,
        }
    }

    /// Returns `true` if this timestamp is strictly after `other`.
    pub fn is_after(&self, other: &Self) -> bool {
        self > other
    }

    /// Wall-clock view of the physical component.
    ///
    /// Returns `None` if the physical component is outside chrono's range.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.physical_ms)
            .ok()
            .and_then(DateTime::from_timestamp_millis)
    }

    /// RFC 3339 rendering of the physical component, millisecond precision.
    pub fn to_rfc3339(&self) -> String {
        match self.to_datetime() {
            Some(dt) => dt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            None => self.to_string(),
        }
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({}ms.{})", self.physical_ms, self.logical)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.physical_ms, self.logical)
    }
}

/// Internal mutable state of the clock.
struct ClockState {
    physical_ms: u64,
    logical: u32,
}

/// Hybrid logical clock producing strictly increasing [`Timestamp`]s.
///
/// - **Local event**: `physical = max(wall_clock, state.physical)`.
///   If physical advanced, `logical = 0`; otherwise `logical += 1`.
/// - **Observe**: after replaying a persisted timestamp, the clock is moved
///   forward so the next local event is strictly after it.
///
/// Safe for concurrent use across threads.
pub struct HybridClock {
    state: Mutex<ClockState>,
}

impl HybridClock {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ClockState {
                physical_ms: 0,
                logical: 0,
            }),
        }
    }

    /// Generate a new timestamp, strictly greater than any previously
    /// returned or observed by this clock.
    pub fn now(&self) -> Timestamp {
        let wall = Self::wall_clock_ms();
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        let new_physical = wall.max(state.physical_ms);
        let new_logical = if new_physical > state.physical_ms {
            0
        } else {
            state.logical + 1
        };

        state.physical_ms = new_physical;
        state.logical = new_logical;
        Timestamp::new(new_physical, new_logical)
    }

    /// Advance the clock so that it never issues a timestamp `<= seen`.
    pub fn observe(&self, seen: Timestamp) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let current = Timestamp::new(state.physical_ms, state.logical);
        if seen > current {
            state.physical_ms = seen.physical_ms;
            state.logical = seen.logical;
        }
    }

    fn wall_clock_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

impl Default for HybridClock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HybridClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HybridClock").finish_non_exhaustive()
    }
}
