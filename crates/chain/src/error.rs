//! Chain and controller errors.

use thiserror::Error;

/// A pipeline run failed.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("Stage '{stage}' failed: {source}")]
    Stage {
        stage: String,
        #[source]
        source: ragchat_core::Error,
    },

    #[error("Pipeline produced no '{0}' value")]
    MissingOutput(String),
}

impl ChainError {
    /// The failing stage, when a stage failed.
    pub fn stage(&self) -> Option<&str> {
        match self {
            ChainError::Stage { stage, .. } => Some(stage),
            ChainError::MissingOutput(_) => None,
        }
    }
}

/// A chat submission was not completed.
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("A response is still pending; wait for it before asking again")]
    Busy,

    #[error("Question is empty")]
    EmptyQuestion,

    #[error(transparent)]
    Upstream(#[from] ChainError),
}
