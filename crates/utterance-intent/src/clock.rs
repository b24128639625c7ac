use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since an arbitrary epoch. Not a wall-clock timestamp type —
/// just a deterministic, serializable instant the pipeline can compare and
/// subtract without depending on any particular time library.
pub type Millis = u64;

/// Injectable "now" source, per the core's requirement that nothing depend
/// on global wall-clock time directly. Production uses [`SystemClock`];
/// tests use [`ManualClock`].
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> Millis;
}

/// Wall-clock UTC, measured in milliseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> Millis {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as Millis)
            .unwrap_or(0)
    }
}

/// Deterministic clock for tests: starts at 0 and only advances when told
/// to. Shareable (`Clone` + `Arc`-backed) so a test can hold a handle and
/// advance time between pipeline calls.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, ms: Millis) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: Millis) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.now.load(Ordering::SeqCst)
    }
}
