use std::sync::atomic::{AtomicI64, Ordering};

use chrono::Utc;

/// Source of log timestamps in Unix milliseconds.
///
/// Values are strictly increasing within one process, even when two writes
/// fall in the same millisecond. Across processes only wall-clock order
/// holds.
#[derive(Debug, Default)]
pub struct Clock {
    last: AtomicI64,
}

impl Clock {
    pub fn now(&self) -> i64 {
        let wall = Utc::now().timestamp_millis();
        let mut prev = self.last.load(Ordering::Relaxed);
        loop {
            let next = wall.max(prev + 1);
            match self
                .last
                .compare_exchange_weak(prev, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }
}
