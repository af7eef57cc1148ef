// Library module for updraft
// Re-exports modules for use in integration tests and external crates

pub mod remote;
pub mod sync;
