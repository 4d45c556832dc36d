//! Shared test infrastructure for the kernel backend tests.

/// The `TestContext` harness wiring a kernel to mock collaborators.
pub mod harness;


pub use harness::TestContext;
