//! Minimal checks applied to a job request before the external service is
//! called.
//!
//! The external service is authoritative for workflow parameters; these
//! checks only reject requests that could never be invoked.

use crate::error::CoreError;

/// Maximum length for dataset ids and workflow names.
pub const MAX_IDENTIFIER_LEN: usize = 255;

/// Trim an identifier and check it is non-empty and within length limit.
///
/// `field` is used in the error message (e.g. "dataset_id").
pub fn validate_identifier(field: &str, value: &str) -> Result<String, CoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation(format!("{field} must not be empty")));
    }
    if trimmed.len() > MAX_IDENTIFIER_LEN {
        return Err(CoreError::Validation(format!(
            "{field} too long: {} chars (max {MAX_IDENTIFIER_LEN})",
            trimmed.len()
        )));
    }
    Ok(trimmed.to_string())
}

/// Parameters are passed through untouched but must be a JSON object.
pub fn validate_parameters(parameters: &serde_json::Value) -> Result<(), CoreError> {
    if !parameters.is_object() {
        return Err(CoreError::Validation(
            "parameters must be a JSON object".to_string(),
        ));
    }
    Ok(())
}

/// Optional static list of workflows that may be invoked.
///
/// An empty list allows every workflow name. Comparison ignores ASCII case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowAllowlist {
    names: Vec<String>,
}

impl WorkflowAllowlist {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names
                .into_iter()
                .map(Into::into)
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty())
                .collect(),
        }
    }

    /// Parse a comma-separated list such as `"overviews,standardization"`.
    pub fn parse(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    pub fn allow_all() -> Self {
        Self::default()
    }

    pub fn is_restricted(&self) -> bool {
        !self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn check(&self, workflow_name: &str) -> Result<(), CoreError> {
        if !self.is_restricted()
            || self
                .names
                .iter()
                .any(|n| n.eq_ignore_ascii_case(workflow_name))
        {
            return Ok(());
        }
        Err(CoreError::Validation(format!(
            "Workflow '{workflow_name}' is not allowed (allowed: {})",
            self.names.join(", ")
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;

    #[test]
    fn identifier_is_trimmed() {
        assert_eq!(validate_identifier("dataset_id", "  ds1 ").unwrap(), "ds1");
    }

    #[test]
    fn blank_identifier_is_rejected() {
        let err = validate_identifier("workflow_name", "   ").unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg.contains("workflow_name"));
    }

    #[test]
    fn overlong_identifier_is_rejected() {
        let long = "x".repeat(MAX_IDENTIFIER_LEN + 1);
        assert!(validate_identifier("dataset_id", &long).is_err());
        assert!(validate_identifier("dataset_id", &long[1..]).is_ok());
    }

    #[test]
    fn parameters_must_be_an_object() {
        assert!(validate_parameters(&json!({})).is_ok());
        assert!(validate_parameters(&json!({"k": [1, 2]})).is_ok());
        assert!(validate_parameters(&json!([1, 2])).is_err());
        assert!(validate_parameters(&json!("x")).is_err());
    }

    #[test]
    fn empty_allowlist_allows_everything() {
        let allow = WorkflowAllowlist::parse("");
        assert!(!allow.is_restricted());
        assert!(allow.check("anything").is_ok());
    }

    #[test]
    fn allowlist_ignores_case_and_whitespace() {
        let allow = WorkflowAllowlist::parse(" overviews , standardization,");
        assert_eq!(allow.names(), ["overviews", "standardization"]);
        assert!(allow.check("Overviews").is_ok());
        assert!(allow.check("standardization").is_ok());
    }

    #[test]
    fn allowlist_rejects_unlisted_workflow() {
        let allow = WorkflowAllowlist::new(["overviews"]);
        let err = allow.check("segmentation").unwrap_err();
        assert_matches!(err, CoreError::Validation(msg) if msg.contains("segmentation"));
    }
}
