use thiserror::Error;

/// Structural problems with an imported or generated graph.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("invalid graph JSON: {0}")]
    Json(String),

    #[error("malformed graph: {0}")]
    Structure(String),

    #[error("duplicate node id '{0}'")]
    DuplicateNode(String),

    #[error("duplicate edge id '{0}'")]
    DuplicateEdge(String),

    #[error("edge '{0}' connects a node to itself")]
    SelfLoop(String),

    #[error("edge '{edge}' references unknown node '{node}'")]
    DanglingEdge { edge: String, node: String },
}

impl From<serde_json::Error> for GraphError {
    fn from(e: serde_json::Error) -> Self {
        GraphError::Json(e.to_string())
    }
}
