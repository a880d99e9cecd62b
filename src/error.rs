use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("failed to load {0}")]
    LoadFailure(String),
    #[error("validation failed: {0}")]
    Validation(String),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CoreError::NotFound { entity, id: id.to_string() }
    }

    /// Load failures can be retried by the caller; nothing else can.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoreError::LoadFailure(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_load_failures_are_retryable() {
        assert!(CoreError::LoadFailure("videos".into()).is_retryable());
        assert!(!CoreError::not_found("video", 3).is_retryable());
        assert!(!CoreError::Validation("bad".into()).is_retryable());
    }

    #[test]
    fn not_found_message_names_entity_and_id() {
        let e = CoreError::not_found("module", "rust-basics");
        assert_eq!(e.to_string(), "module with id rust-basics not found");
    }
}
