//! REST client for the Galaxy workflow API.
//!
//! Wraps the handful of Galaxy endpoints this service needs (workflow
//! lookup, invocation, invocation status and job summary) using
//! [`reqwest`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::json;

use crate::config::GalaxyConfig;
use crate::state_map::map_galaxy_state;
use crate::{InvokeRequest, Invoked, StatusReport, WorkflowError, WorkflowService};

/// Header Galaxy reads the API key from.
const API_KEY_HEADER: &str = "x-api-key";

/// HTTP client for a single Galaxy instance.
pub struct GalaxyClient {
    client: reqwest::Client,
    config: GalaxyConfig,
    base: reqwest::Url,
}

/// Entry returned by `GET /api/workflows`.
#[derive(Debug, Deserialize)]
struct WorkflowSummary {
    id: String,
    name: String,
}

/// The subset of `GET /api/invocations/{id}` this client reads.
#[derive(Debug, Deserialize)]
struct InvocationDetails {
    state: String,
    #[serde(default)]
    steps: serde_json::Value,
    #[serde(default)]
    messages: serde_json::Value,
    #[serde(default)]
    outputs: serde_json::Value,
    #[serde(default)]
    output_collections: serde_json::Value,
}

/// Response of `GET /api/invocations/{id}/jobs_summary`.
#[derive(Debug, Default, Deserialize)]
struct JobsSummary {
    #[serde(default)]
    states: BTreeMap<String, u64>,
}

impl GalaxyClient {
    /// Build a client with the API key installed as a default header.
    pub fn new(config: GalaxyConfig) -> Result<Self, WorkflowError> {
        let base = reqwest::Url::parse(&config.url)
            .map_err(|e| WorkflowError::Config(format!("invalid Galaxy URL: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(WorkflowError::Config(format!(
                "Galaxy URL cannot be a base: {}",
                config.url
            )));
        }

        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&config.api_key)
            .map_err(|_| WorkflowError::Config("API key is not a valid header value".into()))?;
        headers.insert(API_KEY_HEADER, key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            config,
            base,
        })
    }

    pub fn config(&self) -> &GalaxyConfig {
        &self.config
    }

    /// Resolve a workflow name to its Galaxy id.
    ///
    /// Galaxy's `search` is a substring match, so the result is filtered
    /// to an exact, case-insensitive name match.
    async fn find_workflow(&self, name: &str) -> Result<WorkflowSummary, WorkflowError> {
        let response = self
            .client
            .get(self.endpoint(&["api", "workflows"]))
            .query(&[("search", name)])
            .send()
            .await?;

        let workflows: Vec<WorkflowSummary> = Self::parse_response(response).await?;
        workflows
            .into_iter()
            .find(|w| w.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| WorkflowError::UnknownWorkflow(name.to_string()))
    }

    async fn invocation_details(
        &self,
        invocation_id: &str,
    ) -> Result<InvocationDetails, WorkflowError> {
        let response = self
            .client
            .get(self.endpoint(&["api", "invocations", invocation_id]))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn jobs_summary(&self, invocation_id: &str) -> Result<JobsSummary, WorkflowError> {
        let response = self
            .client
            .get(self.endpoint(&["api", "invocations", invocation_id, "jobs_summary"]))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Build the body for `POST /api/workflows/{id}/invocations`.
    fn invocation_body(&self, request: &InvokeRequest) -> serde_json::Value {
        json!({
            "history_name": history_name(&request.workflow_name, &request.dataset_id),
            "inputs": {
                "0": {
                    "src": "url",
                    "url": self.config.dataset_url(&request.dataset_location),
                    "ext": file_ext(&request.dataset_location),
                }
            },
            "inputs_by": "step_index",
            "parameters": request.parameters,
            "parameters_normalized": true,
        })
    }

    // ---- private helpers ----

    /// Append path segments to the base URL, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> reqwest::Url {
        let mut url = self.base.clone();
        // Always Ok: `new` rejects cannot-be-a-base URLs.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`WorkflowError::Api`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, WorkflowError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(WorkflowError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, WorkflowError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl WorkflowService for GalaxyClient {
    async fn invoke(&self, request: &InvokeRequest) -> Result<Invoked, WorkflowError> {
        let workflow = self.find_workflow(&request.workflow_name).await?;
        tracing::debug!(
            workflow_name = %request.workflow_name,
            galaxy_workflow_id = %workflow.id,
            "Resolved workflow",
        );

        let response = self
            .client
            .post(self.endpoint(&["api", "workflows", workflow.id.as_str(), "invocations"]))
            .json(&self.invocation_body(request))
            .send()
            .await?;
        let body: serde_json::Value = Self::parse_response(response).await?;

        // Batch submissions return a list; a single submission returns one object.
        let invocation = match body {
            serde_json::Value::Array(mut items) if !items.is_empty() => items.swap_remove(0),
            other => other,
        };
        let invocation_id = invocation
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| WorkflowError::Decode("invocation response has no id".into()))?
            .to_string();
        let raw_state = invocation
            .get("state")
            .and_then(|v| v.as_str())
            .unwrap_or("new");

        Ok(Invoked {
            invocation_id,
            state: map_galaxy_state(raw_state, &BTreeMap::new()),
        })
    }

    async fn get_status(&self, invocation_id: &str) -> Result<StatusReport, WorkflowError> {
        let details = self.invocation_details(invocation_id).await?;
        let jobs = self.jobs_summary(invocation_id).await?;

        let state = map_galaxy_state(&details.state, &jobs.states);
        let step_summary = json!({
            "invocation_state": details.state,
            "steps": details.steps,
            "job_states": jobs.states,
            "messages": details.messages,
            "outputs": details.outputs,
            "output_collections": details.output_collections,
        });

        Ok(StatusReport {
            state,
            step_summary: Some(step_summary),
        })
    }
}

/// History name used for a run, e.g. `"Overviews - ds1"`.
pub fn history_name(workflow_name: &str, dataset_id: &str) -> String {
    format!("{} - {dataset_id}", capitalize(workflow_name))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Galaxy datatype hint taken from the file extension, `auto` if none.
fn file_ext(location: &str) -> String {
    let file_name = location.rsplit('/').next().unwrap_or(location);
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => ext.to_ascii_lowercase(),
        _ => "auto".to_string(),
    }
}
