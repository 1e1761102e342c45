//! Error types for the record store, similarity index, and data-access facade.
//!
//! Every failure inside the facade is converted into a [`ClinicError`] value
//! instead of being swallowed. The tool dispatcher forwards these untouched to
//! the calling agent (see [`ToolError`](crate::tools::ToolError)).

/// Failure raised by the clinic data layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClinicError {
    /// A referenced record id does not resolve.
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: i32 },

    /// A record could not be rendered to (or parsed from) its text form.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// A record failed validation before being persisted.
    #[error("invalid record: {0}")]
    Validation(String),

    /// The record store could not complete the operation.
    #[error("record store unavailable: {0}")]
    Store(String),

    /// The embedding engine could not embed the given texts.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The index snapshot could not be read or written.
    #[error("snapshot error: {0}")]
    Snapshot(String),
}

impl ClinicError {
    /// Short machine-readable label, used in structured tool error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            ClinicError::NotFound { .. } => "not_found",
            ClinicError::Serialization(_) => "serialization",
            ClinicError::Validation(_) => "validation",
            ClinicError::Store(_) => "store_unavailable",
            ClinicError::Embedding(_) => "embedding_unavailable",
            ClinicError::Snapshot(_) => "snapshot",
        }
    }
}

impl From<serde_json::Error> for ClinicError {
    fn from(error: serde_json::Error) -> Self {
        ClinicError::Serialization(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_entity() {
        let err = ClinicError::NotFound {
            entity: "owner",
            id: 42,
        };
        assert_eq!(err.to_string(), "owner with id 42 not found");
        assert_eq!(err.kind(), "not_found");
    }

    #[test]
    fn serde_errors_become_serialization() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: ClinicError = parse.into();
        assert_eq!(err.kind(), "serialization");
    }
}
