use neo4rs::{query, ConfigBuilder, Graph};

use crate::error::GraphError;

/// Bolt connection pool shared by the Neo4j backend and migrations.
#[derive(Clone)]
pub struct GraphClient {
    pub(crate) graph: Graph,
}

impl GraphClient {
    /// Build the pool and open it. Fails fast on a bad URI or credentials;
    /// the caller decides whether that means local mode.
    pub async fn connect(uri: &str, user: &str, password: &str) -> Result<Self, GraphError> {
        let config = ConfigBuilder::default()
            .uri(uri)
            .user(user)
            .password(password)
            .fetch_size(200)
            .max_connections(8)
            .build()?;
        Ok(Self {
            graph: Graph::connect(config).await?,
        })
    }

    /// Round-trip a trivial query.
    pub async fn ping(&self) -> Result<(), GraphError> {
        let mut rows = self.graph.execute(query("RETURN 1 AS ok")).await?;
        while rows.next().await?.is_some() {}
        Ok(())
    }
}
