pub mod dataset;
pub mod invocation;
