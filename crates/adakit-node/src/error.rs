//! Node client error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed (exit code {code:?}): {stderr}")]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("JSON parse error in {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected node output: {0}")]
    Parse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NodeError {
    /// Text the node printed on rejection, if the process ran at all.
    pub fn node_message(&self) -> Option<&str> {
        match self {
            NodeError::Failed { stderr, .. } => Some(stderr),
            _ => None,
        }
    }
}
