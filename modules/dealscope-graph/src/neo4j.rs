use std::collections::BTreeMap;

use async_trait::async_trait;
use neo4rs::{query, BoltMap, BoltString, BoltType};

use dealscope_common::{AcquirerRank, InvestorOverlap};

use crate::backend::GraphBackend;
use crate::client::GraphClient;
use crate::error::GraphError;
use crate::model::{EdgeSpec, NodeSpec, PropValue, Props};

/// Neo4j-backed graph. Labels and relationship types come from closed enums,
/// so interpolating them into Cypher is safe; everything else is a parameter.
pub struct Neo4jGraph {
    client: GraphClient,
}

impl Neo4jGraph {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }
}

fn to_bolt(props: &Props) -> BoltType {
    let mut map = BoltMap::new();
    for (k, v) in props {
        let value = match v {
            PropValue::Bool(b) => BoltType::from(*b),
            PropValue::Int(i) => BoltType::from(*i),
            PropValue::Float(f) => BoltType::from(*f),
            PropValue::Text(s) => BoltType::from(s.as_str()),
        };
        map.put(BoltString::from(k.as_str()), value);
    }
    BoltType::Map(map)
}

#[async_trait]
impl GraphBackend for Neo4jGraph {
    fn name(&self) -> &'static str {
        "neo4j"
    }

    async fn verify(&self) -> Result<(), GraphError> {
        self.client.ping().await
    }

    async fn upsert_node(&self, node: &NodeSpec) -> Result<(), GraphError> {
        let cypher = format!(
            "MERGE (n:{label} {{name: $name}}) SET n += $props",
            label = node.key.label.as_str()
        );
        let q = query(&cypher)
            .param("name", node.key.name.as_str())
            .param("props", to_bolt(&node.props));
        self.client.graph.run(q).await?;
        Ok(())
    }

    async fn upsert_edge(&self, edge: &EdgeSpec) -> Result<(), GraphError> {
        edge.validate()?;
        let cypher = format!(
            "MERGE (a:{from} {{name: $from_name}})
             MERGE (b:{to} {{name: $to_name}})
             MERGE (a)-[r:{rel}]->(b)
             SET r += $props",
            from = edge.from.label.as_str(),
            to = edge.to.label.as_str(),
            rel = edge.kind.rel_type(),
        );
        let q = query(&cypher)
            .param("from_name", edge.from.name.as_str())
            .param("to_name", edge.to.name.as_str())
            .param("props", to_bolt(&edge.props));
        self.client.graph.run(q).await?;
        Ok(())
    }

    async fn investor_overlap(&self, company: &str) -> Result<Vec<InvestorOverlap>, GraphError> {
        let q = query(
            "MATCH (target:Company {name: $name})<-[:INVESTED_IN]-(inv:Investor)-[:INVESTED_IN]->(comp:Company)
             WHERE comp <> target AND (target)-[:COMPETES_WITH]-(comp)
             RETURN inv.name AS investor, collect(DISTINCT comp.name) AS also_backs
             ORDER BY investor",
        )
        .param("name", company);

        let mut stream = self.client.graph.execute(q).await?;
        let mut overlaps = Vec::new();
        while let Some(row) = stream.next().await? {
            let investor: String = row.get("investor")?;
            let mut also_backs: Vec<String> = row.get("also_backs")?;
            also_backs.sort();
            overlaps.push(InvestorOverlap {
                investor,
                also_backs,
            });
        }
        Ok(overlaps)
    }

    async fn top_acquirers(
        &self,
        company: &str,
        limit: usize,
    ) -> Result<Vec<AcquirerRank>, GraphError> {
        let q = query(
            "MATCH (target:Company {name: $name})-[:OPERATES_IN]->(:Market)<-[:OPERATES_IN]-(t:Company)<-[:ACQUIRED]-(a:Company)
             WHERE t <> target
             WITH a.name AS acquirer, collect(DISTINCT t.name) AS targets
             RETURN acquirer, size(targets) AS deal_count, targets AS targets_acquired
             ORDER BY deal_count DESC, acquirer ASC
             LIMIT $limit",
        )
        .param("name", company)
        .param("limit", limit as i64);

        let mut stream = self.client.graph.execute(q).await?;
        let mut ranks = Vec::new();
        while let Some(row) = stream.next().await? {
            let deal_count: i64 = row.get("deal_count")?;
            let mut targets_acquired: Vec<String> = row.get("targets_acquired")?;
            targets_acquired.sort();
            ranks.push(AcquirerRank {
                acquirer: row.get("acquirer")?,
                deal_count: deal_count.max(0) as u64,
                targets_acquired,
            });
        }
        Ok(ranks)
    }

    async fn competitor_count(&self, company: &str) -> Result<u64, GraphError> {
        let q = query(
            "MATCH (target:Company {name: $name})-[:COMPETES_WITH]-(comp:Company)
             WHERE comp <> target
             RETURN count(DISTINCT comp) AS competitor_count",
        )
        .param("name", company);

        let mut stream = self.client.graph.execute(q).await?;
        match stream.next().await? {
            Some(row) => {
                let n: i64 = row.get("competitor_count")?;
                Ok(n.max(0) as u64)
            }
            None => Ok(0),
        }
    }

    async fn label_counts(&self) -> Result<BTreeMap<String, u64>, GraphError> {
        let q = query(
            "MATCH (n) WHERE size(labels(n)) > 0
             RETURN labels(n)[0] AS label, count(n) AS count",
        );

        let mut stream = self.client.graph.execute(q).await?;
        let mut counts = BTreeMap::new();
        while let Some(row) = stream.next().await? {
            let label: String = row.get("label")?;
            let count: i64 = row.get("count")?;
            counts.insert(label, count.max(0) as u64);
        }
        Ok(counts)
    }
}
