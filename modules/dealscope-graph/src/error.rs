use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    /// The backend cannot be reached. Disables the graph for the rest of a run.
    #[error("graph unreachable: {0}")]
    Unreachable(String),

    #[error("graph query failed: {0}")]
    Query(String),

    #[error("invalid edge {kind}: {reason}")]
    InvalidEdge { kind: &'static str, reason: String },
}

impl GraphError {
    pub fn is_connectivity(&self) -> bool {
        matches!(self, GraphError::Unreachable(_))
    }
}

impl From<neo4rs::Error> for GraphError {
    fn from(e: neo4rs::Error) -> Self {
        match &e {
            neo4rs::Error::IOError { .. }
            | neo4rs::Error::ConnectionError
            | neo4rs::Error::AuthenticationError(_) => GraphError::Unreachable(e.to_string()),
            _ => GraphError::Query(e.to_string()),
        }
    }
}

impl From<neo4rs::DeError> for GraphError {
    fn from(e: neo4rs::DeError) -> Self {
        GraphError::Query(e.to_string())
    }
}
