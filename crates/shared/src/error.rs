//! Error taxonomy for the session manager.
//!
//! Missing-id CRUD operations are deliberately not errors: they are silent
//! no-ops, traced at debug level by the session crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// A generation is already in flight; the manager holds one slot
    #[error("a generation is already running")]
    AlreadyGenerating,

    /// The model could not be fetched or loaded
    #[error("model resolution failed: {0}")]
    ModelResolution(String),

    /// The stream failed, before or after the first chunk
    #[error("generation failed: {0}")]
    Generation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_user_presentable() {
        let err = SessionError::ModelResolution("no such model: llama9".into());
        assert_eq!(
            err.to_string(),
            "model resolution failed: no such model: llama9"
        );
        assert_eq!(
            SessionError::AlreadyGenerating.to_string(),
            "a generation is already running"
        );
    }
}
