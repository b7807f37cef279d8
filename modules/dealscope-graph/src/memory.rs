//! In-process backend: a node table and an edge table behind one lock.
//!
//! Used when no Neo4j instance is configured but graph insights are still
//! wanted (`GRAPH_BACKEND=memory`), and as the reference backend in tests.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use dealscope_common::{AcquirerRank, InvestorOverlap};

use crate::backend::GraphBackend;
use crate::error::GraphError;
use crate::model::{merge_props, EdgeKind, EdgeSpec, NodeKey, NodeLabel, NodeSpec, Props};

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct EdgeKey {
    kind: EdgeKind,
    from: NodeKey,
    to: NodeKey,
}

#[derive(Default)]
struct Tables {
    nodes: BTreeMap<NodeKey, Props>,
    edges: BTreeMap<EdgeKey, Props>,
}

impl Tables {
    fn targets<'a>(
        &'a self,
        kind: EdgeKind,
        from: &'a NodeKey,
    ) -> impl Iterator<Item = &'a NodeKey> + 'a {
        self.edges
            .keys()
            .filter(move |k| k.kind == kind && &k.from == from)
            .map(|k| &k.to)
    }

    fn sources<'a>(
        &'a self,
        kind: EdgeKind,
        to: &'a NodeKey,
    ) -> impl Iterator<Item = &'a NodeKey> + 'a {
        self.edges
            .keys()
            .filter(move |k| k.kind == kind && &k.to == to)
            .map(|k| &k.from)
    }

    fn competitors(&self, company: &NodeKey) -> BTreeSet<NodeKey> {
        self.targets(EdgeKind::CompetesWith, company)
            .chain(self.sources(EdgeKind::CompetesWith, company))
            .filter(|c| *c != company)
            .cloned()
            .collect()
    }
}

#[derive(Default)]
pub struct MemoryGraph {
    tables: RwLock<Tables>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored properties of a node, if it exists.
    pub async fn node_props(&self, key: &NodeKey) -> Option<Props> {
        self.tables.read().await.nodes.get(key).cloned()
    }

    /// Stored properties of an edge, if it exists.
    pub async fn edge_props(&self, kind: EdgeKind, from: &NodeKey, to: &NodeKey) -> Option<Props> {
        let key = EdgeKey {
            kind,
            from: from.clone(),
            to: to.clone(),
        };
        self.tables.read().await.edges.get(&key).cloned()
    }

    pub async fn edge_count(&self) -> usize {
        self.tables.read().await.edges.len()
    }
}

#[async_trait]
impl GraphBackend for MemoryGraph {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn verify(&self) -> Result<(), GraphError> {
        Ok(())
    }

    async fn upsert_node(&self, node: &NodeSpec) -> Result<(), GraphError> {
        let mut tables = self.tables.write().await;
        let props = tables.nodes.entry(node.key.clone()).or_default();
        merge_props(props, &node.props);
        Ok(())
    }

    async fn upsert_edge(&self, edge: &EdgeSpec) -> Result<(), GraphError> {
        edge.validate()?;
        let mut tables = self.tables.write().await;
        tables.nodes.entry(edge.from.clone()).or_default();
        tables.nodes.entry(edge.to.clone()).or_default();
        let key = EdgeKey {
            kind: edge.kind,
            from: edge.from.clone(),
            to: edge.to.clone(),
        };
        let props = tables.edges.entry(key).or_default();
        merge_props(props, &edge.props);
        Ok(())
    }

    async fn investor_overlap(&self, company: &str) -> Result<Vec<InvestorOverlap>, GraphError> {
        let tables = self.tables.read().await;
        let target = NodeKey::company(company);
        let competitors = tables.competitors(&target);

        let investors: BTreeSet<&NodeKey> = tables.sources(EdgeKind::InvestedIn, &target).collect();
        let mut overlaps = Vec::new();
        for investor in investors {
            let also_backs: BTreeSet<String> = tables
                .targets(EdgeKind::InvestedIn, investor)
                .filter(|c| competitors.contains(*c))
                .map(|c| c.name.clone())
                .collect();
            if !also_backs.is_empty() {
                overlaps.push(InvestorOverlap {
                    investor: investor.name.clone(),
                    also_backs: also_backs.into_iter().collect(),
                });
            }
        }
        Ok(overlaps)
    }

    async fn top_acquirers(
        &self,
        company: &str,
        limit: usize,
    ) -> Result<Vec<AcquirerRank>, GraphError> {
        let guard = self.tables.read().await;
        let tables: &Tables = &guard;
        let target = NodeKey::company(company);

        let peers: BTreeSet<&NodeKey> = tables
            .targets(EdgeKind::OperatesIn, &target)
            .flat_map(|market| tables.sources(EdgeKind::OperatesIn, market))
            .filter(|c| **c != target)
            .collect();

        let mut deals: BTreeMap<&str, BTreeSet<String>> = BTreeMap::new();
        for acquired in peers {
            for acquirer in tables.sources(EdgeKind::Acquired, acquired) {
                deals
                    .entry(acquirer.name.as_str())
                    .or_default()
                    .insert(acquired.name.clone());
            }
        }

        let mut ranks: Vec<AcquirerRank> = deals
            .into_iter()
            .map(|(acquirer, targets)| AcquirerRank {
                acquirer: acquirer.to_string(),
                deal_count: targets.len() as u64,
                targets_acquired: targets.into_iter().collect(),
            })
            .collect();
        ranks.sort_by(|a, b| {
            b.deal_count
                .cmp(&a.deal_count)
                .then_with(|| a.acquirer.cmp(&b.acquirer))
        });
        ranks.truncate(limit);
        Ok(ranks)
    }

    async fn competitor_count(&self, company: &str) -> Result<u64, GraphError> {
        let tables = self.tables.read().await;
        Ok(tables.competitors(&NodeKey::company(company)).len() as u64)
    }

    async fn label_counts(&self) -> Result<BTreeMap<String, u64>, GraphError> {
        let tables = self.tables.read().await;
        let mut counts = BTreeMap::new();
        for label in NodeLabel::ALL {
            let n = tables.nodes.keys().filter(|k| k.label == label).count() as u64;
            if n > 0 {
                counts.insert(label.as_str().to_string(), n);
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PropValue;

    fn acquired(acquirer: &str, target: &str) -> EdgeSpec {
        EdgeSpec::new(
            EdgeKind::Acquired,
            NodeKey::company(acquirer),
            NodeKey::company(target),
        )
    }

    fn operates_in(company: &str, market: &str) -> EdgeSpec {
        EdgeSpec::new(
            EdgeKind::OperatesIn,
            NodeKey::company(company),
            NodeKey::market(market),
        )
    }

    #[tokio::test]
    async fn node_upsert_coalesces_missing_properties() {
        let g = MemoryGraph::new();
        g.upsert_node(&NodeSpec::new(NodeKey::company("Acme")).with_text("sector", "Fintech"))
            .await
            .unwrap();
        g.upsert_node(&NodeSpec::new(NodeKey::company("Acme")).with_text("hq", "Austin"))
            .await
            .unwrap();

        let props = g.node_props(&NodeKey::company("Acme")).await.unwrap();
        assert_eq!(props["sector"], PropValue::Text("Fintech".into()));
        assert_eq!(props["hq"], PropValue::Text("Austin".into()));
        assert_eq!(g.label_counts().await.unwrap()["Company"], 1);
    }

    #[tokio::test]
    async fn edge_upsert_is_unique_per_type_and_endpoints() {
        let g = MemoryGraph::new();
        let edge = EdgeSpec::new(
            EdgeKind::InvestedIn,
            NodeKey::investor("Sequoia"),
            NodeKey::company("Acme"),
        );
        g.upsert_edge(&edge.clone().with("is_lead", true)).await.unwrap();
        g.upsert_edge(&edge).await.unwrap();

        assert_eq!(g.edge_count().await, 1);
        let props = g
            .edge_props(
                EdgeKind::InvestedIn,
                &NodeKey::investor("Sequoia"),
                &NodeKey::company("Acme"),
            )
            .await
            .unwrap();
        assert_eq!(props["is_lead"], PropValue::Bool(true));
    }

    #[tokio::test]
    async fn edge_upsert_creates_endpoints() {
        let g = MemoryGraph::new();
        g.upsert_edge(&operates_in("Acme", "Payments")).await.unwrap();
        let counts = g.label_counts().await.unwrap();
        assert_eq!(counts["Company"], 1);
        assert_eq!(counts["Market"], 1);
        assert!(!counts.contains_key("Person"));
    }

    #[tokio::test]
    async fn invalid_edge_is_rejected() {
        let g = MemoryGraph::new();
        let bad = EdgeSpec::new(
            EdgeKind::Founded,
            NodeKey::company("Acme"),
            NodeKey::company("Acme"),
        );
        assert!(g.upsert_edge(&bad).await.is_err());
        assert_eq!(g.edge_count().await, 0);
    }

    #[tokio::test]
    async fn top_acquirers_rank_by_deals_then_name() {
        let g = MemoryGraph::new();
        for c in ["Acme", "X", "Y", "Z"] {
            g.upsert_edge(&operates_in(c, "Payments")).await.unwrap();
        }
        g.upsert_edge(&acquired("B", "Z")).await.unwrap();
        g.upsert_edge(&acquired("A", "X")).await.unwrap();
        g.upsert_edge(&acquired("A", "Y")).await.unwrap();
        g.upsert_edge(&acquired("C", "Y")).await.unwrap();
        // Outside the market: ignored.
        g.upsert_edge(&acquired("D", "Elsewhere")).await.unwrap();

        let ranks = g.top_acquirers("Acme", 5).await.unwrap();
        let names: Vec<_> = ranks.iter().map(|r| r.acquirer.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(ranks[0].deal_count, 2);
        assert_eq!(ranks[0].targets_acquired, vec!["X", "Y"]);

        assert_eq!(g.top_acquirers("Acme", 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn acquisitions_of_the_target_itself_are_not_counted() {
        let g = MemoryGraph::new();
        g.upsert_edge(&operates_in("Acme", "Payments")).await.unwrap();
        g.upsert_edge(&acquired("BigCo", "Acme")).await.unwrap();
        assert!(g.top_acquirers("Acme", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn investor_overlap_considers_both_competition_directions() {
        let g = MemoryGraph::new();
        let invests = |inv: &str, co: &str| {
            EdgeSpec::new(EdgeKind::InvestedIn, NodeKey::investor(inv), NodeKey::company(co))
        };
        let competes = |a: &str, b: &str| {
            EdgeSpec::new(EdgeKind::CompetesWith, NodeKey::company(a), NodeKey::company(b))
        };
        g.upsert_edge(&competes("Acme", "Rival")).await.unwrap();
        g.upsert_edge(&competes("Other", "Acme")).await.unwrap();
        g.upsert_edge(&invests("Sequoia", "Acme")).await.unwrap();
        g.upsert_edge(&invests("Sequoia", "Rival")).await.unwrap();
        g.upsert_edge(&invests("Sequoia", "Other")).await.unwrap();
        g.upsert_edge(&invests("Accel", "Acme")).await.unwrap();
        g.upsert_edge(&invests("Accel", "Unrelated")).await.unwrap();

        let overlaps = g.investor_overlap("Acme").await.unwrap();
        assert_eq!(overlaps.len(), 1);
        assert_eq!(overlaps[0].investor, "Sequoia");
        assert_eq!(overlaps[0].also_backs, vec!["Other", "Rival"]);

        assert_eq!(g.competitor_count("Acme").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn queries_on_unknown_company_are_empty() {
        let g = MemoryGraph::new();
        assert!(g.investor_overlap("Nobody").await.unwrap().is_empty());
        assert!(g.top_acquirers("Nobody", 5).await.unwrap().is_empty());
        assert_eq!(g.competitor_count("Nobody").await.unwrap(), 0);
        assert!(g.label_counts().await.unwrap().is_empty());
    }
}
