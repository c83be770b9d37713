use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;

/// One throttle per configured interval for the whole process.
static PROCESS_THROTTLES: Lazy<Mutex<HashMap<Duration, Arc<Throttle>>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Enforces a minimum gap between upstream decode calls across every caller
/// holding the same instance. Share it with `Arc` to get a process-wide limit.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_call: Mutex::new(None),
        }
    }

    pub fn shared(interval: Duration) -> Arc<Self> {
        Arc::new(Self::new(interval))
    }

    /// The process-wide throttle for `interval`. Every decoder configured with the
    /// same interval gets the same instance, so their upstream calls are spaced together.
    pub fn process_wide(interval: Duration) -> Arc<Self> {
        let mut throttles = PROCESS_THROTTLES
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(
            throttles
                .entry(interval)
                .or_insert_with(|| Self::shared(interval)),
        )
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Block until `interval` has passed since the previous caller was let through,
    /// then record this caller as the latest. Returns how long it waited.
    ///
    /// Waiters queue on the lock, so concurrent callers are released one per interval.
    pub fn wait(&self) -> Duration {
        // The guarded value is a plain timestamp, still valid after a panic elsewhere
        let mut last_call = self.last_call.lock().unwrap_or_else(PoisonError::into_inner);

        let mut waited = Duration::ZERO;
        if let Some(previous) = *last_call {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                waited = self.interval - elapsed;
                thread::sleep(waited);
            }
        }

        *last_call = Some(Instant::now());
        waited
    }
}
