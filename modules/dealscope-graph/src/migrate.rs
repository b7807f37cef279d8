use neo4rs::query;
use tracing::{info, warn};

use crate::error::GraphError;
use crate::model::NodeLabel;
use crate::GraphClient;

/// Idempotent schema setup: one uniqueness constraint on `name` per label.
pub async fn migrate(client: &GraphClient) -> Result<(), GraphError> {
    info!("Running graph schema migrations...");

    for label in NodeLabel::ALL {
        let stmt = format!(
            "CREATE CONSTRAINT {}_name_unique IF NOT EXISTS FOR (n:{}) REQUIRE n.name IS UNIQUE",
            label.as_str().to_lowercase(),
            label.as_str()
        );
        run_ignoring_exists(client, &stmt).await?;
    }

    info!("Graph schema migrations complete");
    Ok(())
}

async fn run_ignoring_exists(client: &GraphClient, stmt: &str) -> Result<(), GraphError> {
    match client.graph.run(query(stmt)).await {
        Ok(()) => Ok(()),
        Err(e) => {
            let msg = e.to_string();
            if msg.contains("already exists") || msg.contains("EquivalentSchemaRule") {
                warn!("Constraint already present, skipping: {stmt}");
                Ok(())
            } else {
                Err(e.into())
            }
        }
    }
}
