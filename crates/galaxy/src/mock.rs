//! Scripted in-process [`WorkflowService`].
//!
//! Lets callers decide what each invoke returns and what each invocation's
//! status looks like, inject failures and delays, and inspect which calls
//! were made.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use trees_core::state::InvocationState;

use crate::{InvokeRequest, Invoked, StatusReport, WorkflowError, WorkflowService};

/// What the next invoke call should produce.
enum InvokeOutcome {
    Accept(Invoked),
    Reject { status: u16, body: String },
    UnknownWorkflow,
}

#[derive(Default)]
struct Script {
    invoke_outcomes: VecDeque<InvokeOutcome>,
    statuses: HashMap<String, Result<StatusReport, String>>,
    delays: HashMap<String, Duration>,
    invoke_delay: Option<Duration>,
    invoke_calls: Vec<InvokeRequest>,
    status_calls: HashMap<String, usize>,
}

#[derive(Default)]
pub struct ScriptedWorkflowService {
    script: Mutex<Script>,
    next_id: AtomicUsize,
}

impl ScriptedWorkflowService {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue the identifier and initial state for the next invoke.
    ///
    /// Without a queued outcome, invokes are accepted as `inv-<n>`/`queued`.
    pub fn push_invocation(&self, invocation_id: &str, state: InvocationState) {
        self.script()
            .invoke_outcomes
            .push_back(InvokeOutcome::Accept(Invoked {
                invocation_id: invocation_id.to_string(),
                state,
            }));
    }

    /// Make the next invoke fail with the given HTTP status and body.
    pub fn push_invoke_failure(&self, status: u16, body: &str) {
        self.script().invoke_outcomes.push_back(InvokeOutcome::Reject {
            status,
            body: body.to_string(),
        });
    }

    /// Make the next invoke report the workflow as unknown.
    pub fn push_unknown_workflow(&self) {
        self.script()
            .invoke_outcomes
            .push_back(InvokeOutcome::UnknownWorkflow);
    }

    /// Set what `get_status` returns for an invocation.
    pub fn set_status(
        &self,
        invocation_id: &str,
        state: InvocationState,
        step_summary: Option<serde_json::Value>,
    ) {
        self.script().statuses.insert(
            invocation_id.to_string(),
            Ok(StatusReport {
                state,
                step_summary,
            }),
        );
    }

    /// Make `get_status` fail for an invocation.
    pub fn fail_status(&self, invocation_id: &str, message: &str) {
        self.script()
            .statuses
            .insert(invocation_id.to_string(), Err(message.to_string()));
    }

    /// Delay `get_status` for an invocation before answering.
    pub fn delay_status(&self, invocation_id: &str, delay: Duration) {
        self.script()
            .delays
            .insert(invocation_id.to_string(), delay);
    }

    /// Delay every invoke after it is recorded and before it answers.
    pub fn delay_invoke(&self, delay: Duration) {
        self.script().invoke_delay = Some(delay);
    }

    /// Every invoke request received, in order.
    pub fn invoke_calls(&self) -> Vec<InvokeRequest> {
        self.script().invoke_calls.clone()
    }

    /// How many times `get_status` was called for an invocation.
    pub fn status_calls(&self, invocation_id: &str) -> usize {
        self.script()
            .status_calls
            .get(invocation_id)
            .copied()
            .unwrap_or(0)
    }

    /// Total `get_status` calls across all invocations.
    pub fn total_status_calls(&self) -> usize {
        self.script().status_calls.values().sum()
    }
}

#[async_trait]
impl WorkflowService for ScriptedWorkflowService {
    async fn invoke(&self, request: &InvokeRequest) -> Result<Invoked, WorkflowError> {
        let (outcome, delay) = {
            let mut script = self.script();
            script.invoke_calls.push(request.clone());
            (script.invoke_outcomes.pop_front(), script.invoke_delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match outcome {
            Some(InvokeOutcome::Accept(invoked)) => Ok(invoked),
            Some(InvokeOutcome::Reject { status, body }) => {
                Err(WorkflowError::Api { status, body })
            }
            Some(InvokeOutcome::UnknownWorkflow) => {
                Err(WorkflowError::UnknownWorkflow(request.workflow_name.clone()))
            }
            None => {
                let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(Invoked {
                    invocation_id: format!("inv-{n}"),
                    state: InvocationState::Queued,
                })
            }
        }
    }

    async fn get_status(&self, invocation_id: &str) -> Result<StatusReport, WorkflowError> {
        let (delay, answer) = {
            let mut script = self.script();
            *script
                .status_calls
                .entry(invocation_id.to_string())
                .or_insert(0) += 1;
            (
                script.delays.get(invocation_id).copied(),
                script.statuses.get(invocation_id).cloned(),
            )
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        match answer {
            Some(Ok(report)) => Ok(report),
            Some(Err(body)) => Err(WorkflowError::Api { status: 503, body }),
            None => Err(WorkflowError::Api {
                status: 404,
                body: format!("invocation {invocation_id} not found"),
            }),
        }
    }
}
