use std::{fmt::Display, sync::atomic::{AtomicU64, Ordering}};

use serde::{Deserialize, Serialize};

/// Engine-assigned identity of one plan node.
///
/// Two nodes share an id only when they are the same plan object, e.g. a
/// cached or named fragment referenced from several artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(transparent)]
pub struct PlanId(pub u64);

impl Display for PlanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Sequential id source shared by a catalog and every builder created from it.
#[derive(Debug, Default)]
pub struct IdManager {
    current: AtomicU64,
}

impl IdManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next id handed out will be `current + 1`.
    pub fn with_current(current: u64) -> Self {
        Self { current: AtomicU64::new(current) }
    }

    pub fn next_id(&self) -> PlanId {
        // u64::MAX wraps back to 0, then the next call yields 1
        PlanId(self.current.fetch_add(1, Ordering::Relaxed).wrapping_add(1))
    }
}
