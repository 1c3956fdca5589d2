//! Port traits defining external boundaries.
//!
//! The pipeline itself is pure; only reading the capture, writing the
//! generated suites, and stamping the manifest touch the outside world.
//! Implementations live in `src/adapters/`.

pub mod clock;
pub mod filesystem;

pub use clock::Clock;
pub use filesystem::FileSystem;
