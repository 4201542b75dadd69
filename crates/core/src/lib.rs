//! Domain vocabulary for the trees job orchestration service.
//!
//! Pure logic only: invocation states and their terminal partition,
//! workflow request checks, and the shared error type. No I/O lives here.

pub mod error;
pub mod state;
pub mod types;
pub mod workflow;
