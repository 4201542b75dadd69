//! Status reconciliation between the invocation store and the external
//! workflow service.
//!
//! [`Reconciler::sync_once`] runs one tick over every non-terminal record;
//! [`Reconciler::run`] repeats it on a fixed interval until cancelled.

pub mod config;
pub mod reconciler;

pub use config::SyncConfig;
pub use reconciler::{plan_update, Reconciler, SyncStats};
