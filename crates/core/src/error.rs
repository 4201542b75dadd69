/// Domain-level errors shared by every crate in the workspace.
///
/// Identifiers in this system are strings assigned by external services,
/// so `NotFound` carries the id as text.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),
}
