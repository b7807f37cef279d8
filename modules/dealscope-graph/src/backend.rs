use std::collections::BTreeMap;

use async_trait::async_trait;

use dealscope_common::{AcquirerRank, InvestorOverlap};

use crate::error::GraphError;
use crate::model::{EdgeSpec, NodeSpec};

/// Storage behind the relationship graph.
///
/// Upserts are idempotent: nodes merge on (label, name), edges on
/// (type, from, to), and supplied properties overwrite while absent ones
/// keep their stored value. Edge upserts create missing endpoint nodes.
#[async_trait]
pub trait GraphBackend: Send + Sync {
    /// Short name used in logs and `/health`.
    fn name(&self) -> &'static str;

    /// Round-trip check; `Unreachable` means the backend is down.
    async fn verify(&self) -> Result<(), GraphError>;

    async fn upsert_node(&self, node: &NodeSpec) -> Result<(), GraphError>;

    async fn upsert_edge(&self, edge: &EdgeSpec) -> Result<(), GraphError>;

    /// Investors backing `company` and at least one company it competes with
    /// (either direction). Sorted by investor name.
    async fn investor_overlap(&self, company: &str) -> Result<Vec<InvestorOverlap>, GraphError>;

    /// Acquirers of other companies operating in any market `company`
    /// operates in, by distinct deals descending then name ascending.
    async fn top_acquirers(
        &self,
        company: &str,
        limit: usize,
    ) -> Result<Vec<AcquirerRank>, GraphError>;

    /// Distinct companies linked to `company` by COMPETES_WITH in either direction.
    async fn competitor_count(&self, company: &str) -> Result<u64, GraphError>;

    /// Node count per label, labels with no nodes omitted.
    async fn label_counts(&self) -> Result<BTreeMap<String, u64>, GraphError>;
}
