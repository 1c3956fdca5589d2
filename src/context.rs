//! Service context bundling all port trait objects.

use crate::adapters::live::clock::LiveClock;
use crate::adapters::live::filesystem::LiveFileSystem;
use crate::ports::clock::Clock;
use crate::ports::filesystem::FileSystem;

/// Bundles the port trait objects the generator needs.
///
/// Constructors wire up different adapter implementations: [`ServiceContext::live`]
/// for real runs, [`ServiceContext::new`] for anything else (tests pass the
/// in-memory adapters).
pub struct ServiceContext {
    /// Clock for stamping the manifest.
    pub clock: Box<dyn Clock>,
    /// Filesystem for reading captures and writing suites.
    pub fs: Box<dyn FileSystem>,
}

impl ServiceContext {
    /// Creates a live context backed by the system clock and real disk.
    #[must_use]
    pub fn live() -> Self {
        Self { clock: Box::new(LiveClock), fs: Box::new(LiveFileSystem) }
    }

    /// Creates a context from explicit adapters.
    #[must_use]
    pub fn new(clock: Box<dyn Clock>, fs: Box<dyn FileSystem>) -> Self {
        Self { clock, fs }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::adapters::memory::{FixedClock, MemoryFileSystem};

    #[test]
    fn new_context_dispatches_to_given_adapters() {
        let at = chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let ctx = ServiceContext::new(
            Box::new(FixedClock(at)),
            Box::new(MemoryFileSystem::with_file("/capture.json", "[]")),
        );

        assert_eq!(ctx.clock.now(), at);
        assert_eq!(ctx.fs.read_to_string(Path::new("/capture.json")).unwrap(), "[]");
    }

    #[test]
    fn live_context_sees_real_disk() {
        let ctx = ServiceContext::live();
        assert!(ctx.fs.exists(Path::new(env!("CARGO_MANIFEST_DIR"))));
    }
}
