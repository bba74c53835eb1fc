use crate::NodeId;

/// Errors from structural scene operations.
///
/// These are programming errors reported to the immediate caller; nothing
/// inside the scene retries or clamps.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("node {0:?} not found")]
    NodeNotFound(NodeId),
    #[error("child index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("invalid structure: {0}")]
    InvalidStructure(String),
    #[error("{operation} is not supported for {kind} nodes")]
    Unsupported {
        operation: &'static str,
        kind: &'static str,
    },
}
