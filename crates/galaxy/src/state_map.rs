//! Translation from Galaxy invocation/job states to [`InvocationState`].
//!
//! Galaxy keeps an invocation in `scheduled` once every step has been
//! scheduled, even while its jobs are still running, so completion is
//! derived from the per-state job counts.

use std::collections::BTreeMap;

use trees_core::state::InvocationState;

/// Job states that mean the job finished without error.
const JOB_OK_STATES: [&str; 2] = ["ok", "skipped"];

/// Job states that mean the job failed.
const JOB_ERROR_STATES: [&str; 2] = ["error", "failed"];

/// Map a Galaxy invocation state plus job counts to the stored state.
///
/// Unknown Galaxy states are passed through verbatim.
pub fn map_galaxy_state(
    invocation_state: &str,
    job_states: &BTreeMap<String, u64>,
) -> InvocationState {
    match invocation_state {
        "new" | "ready" | "requires_materialization" => InvocationState::Queued,
        "scheduled" => derive_from_jobs(job_states),
        "completed" => InvocationState::Completed,
        "failed" | "cancelled" => InvocationState::Failed,
        other => InvocationState::from(other),
    }
}

fn derive_from_jobs(job_states: &BTreeMap<String, u64>) -> InvocationState {
    let count = |names: &[&str]| -> u64 {
        job_states
            .iter()
            .filter(|(state, _)| names.contains(&state.as_str()))
            .map(|(_, n)| *n)
            .sum()
    };

    let total: u64 = job_states.values().sum();
    if count(&JOB_ERROR_STATES[..]) > 0 {
        InvocationState::Failed
    } else if total > 0 && count(&JOB_OK_STATES[..]) == total {
        InvocationState::Completed
    } else {
        InvocationState::InProgress
    }
}
