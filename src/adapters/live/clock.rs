//! Wall-clock adapter.

use chrono::{DateTime, Utc};

use crate::ports::clock::Clock;

/// Reads the system clock; used to stamp the manifest of a real run.
pub struct LiveClock;

impl Clock for LiveClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successive_reads_do_not_go_backwards() {
        let first = LiveClock.now();
        let second = LiveClock.now();
        assert!(second >= first);
    }
}
