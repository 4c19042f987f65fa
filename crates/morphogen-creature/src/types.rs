//! Identity of developed individuals

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static CREATURE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Handed out once per [`crate::Creature`] development. Twins grown from one
/// strand compare unequal through this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CreatureId(u64);

impl CreatureId {
    pub fn next() -> Self {
        CreatureId(CREATURE_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CreatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
