use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_REGISTER: AtomicU64 = AtomicU64::new(1);

/// Identity of one value slot in an invocation's register store.
///
/// Registers come from a process-wide counter, so no two compiled graphs (and no
/// two slots of one graph) ever share one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Register(u64);

impl Register {
    pub fn allocate() -> Self {
        Register(NEXT_REGISTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}
