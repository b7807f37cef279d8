//! Turns the three entity bundles into graph writes and applies them.
//!
//! Planning is pure so the exact write set can be tested without a backend.
//! Application is sequential and non-transactional: a failed write is logged
//! and the rest continue, and earlier writes stay in place.

use tracing::{debug, info, warn};

use dealscope_common::{CoreEntities, MarketEntities, SignalEntities};

use crate::model::{EdgeKind, EdgeSpec, GraphWrite, NodeKey, NodeSpec};
use crate::store::RelationshipGraph;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BuildStats {
    pub planned: usize,
    pub written: usize,
    pub failed: usize,
    pub skipped: usize,
}

fn blank(s: &str) -> bool {
    s.trim().is_empty()
}

/// Every node and edge the bundles imply, in application order.
///
/// `target` is the resolved subject company name. Entries with a blank name
/// on either end are dropped, as are self-referencing company edges.
pub fn plan_writes(
    target: &str,
    core: &CoreEntities,
    market: &MarketEntities,
    signals: &SignalEntities,
) -> Vec<GraphWrite> {
    let mut writes = Vec::new();
    if blank(target) {
        return writes;
    }
    let company = NodeKey::company(target);
    let mut node = |n: NodeSpec| writes.push(GraphWrite::Node(n));

    // Subject company
    let info = &core.company;
    node(
        NodeSpec::new(company.clone())
            .with_text("sector", &info.sector)
            .with_text("sub_sector", &info.sub_sector)
            .with_opt("founded_year", info.founded_year)
            .with_text("hq", &info.hq_location)
            .with_text("description", &info.description)
            .with_text("total_funding", &core.funding.total_raised)
            .with_text("estimated_revenue", &core.traction.estimated_revenue)
            .with("is_target", true),
    );

    // Market
    let market_key = (!blank(&market.market.name)).then(|| NodeKey::market(&market.market.name));
    if let Some(key) = &market_key {
        node(
            NodeSpec::new(key.clone())
                .with_text("tam", &market.market.tam)
                .with_text("growth_rate", &market.market.growth_rate),
        );
    }

    // Founders
    for founder in core.founders.iter().filter(|f| !blank(&f.name)) {
        node(
            NodeSpec::new(NodeKey::person(&founder.name))
                .with_text("role", &founder.role)
                .with_text("background", &founder.background),
        );
    }

    // Investors
    for investor in core.investors.iter().filter(|i| !blank(&i.name)) {
        let kind = if investor.kind.eq_ignore_ascii_case("unknown") {
            ""
        } else {
            investor.kind.as_str()
        };
        node(NodeSpec::new(NodeKey::investor(&investor.name)).with_text("type", kind));
    }

    // Competitors
    for comp in core.competitors.iter().filter(|c| !blank(&c.name)) {
        node(
            NodeSpec::new(NodeKey::company(&comp.name))
                .with_text("estimated_funding", &comp.estimated_funding),
        );
    }
    for detail in market.competitor_details.iter().filter(|d| !blank(&d.name)) {
        node(
            NodeSpec::new(NodeKey::company(&detail.name))
                .with_text("total_funding", &detail.total_funding)
                .with_text("estimated_revenue", &detail.estimated_revenue),
        );
    }

    let mut edge = |e: EdgeSpec| {
        if blank(&e.from.name) || blank(&e.to.name) || e.from == e.to {
            return;
        }
        writes.push(GraphWrite::Edge(e));
    };

    if let Some(key) = &market_key {
        edge(EdgeSpec::new(EdgeKind::OperatesIn, company.clone(), key.clone()));
    }

    for founder in &core.founders {
        let person = NodeKey::person(&founder.name);
        edge(EdgeSpec::new(EdgeKind::Founded, person.clone(), company.clone()));
        edge(
            EdgeSpec::new(EdgeKind::Leads, person.clone(), company.clone())
                .with_text("role", &founder.role),
        );
        for prior in &founder.prior_companies {
            edge(EdgeSpec::new(
                EdgeKind::PreviouslyAt,
                person.clone(),
                NodeKey::company(prior),
            ));
        }
    }

    for investor in &core.investors {
        edge(
            EdgeSpec::new(
                EdgeKind::InvestedIn,
                NodeKey::investor(&investor.name),
                company.clone(),
            )
            .with("is_lead", investor.is_lead),
        );
    }

    for comp in &core.competitors {
        edge(
            EdgeSpec::new(EdgeKind::CompetesWith, company.clone(), NodeKey::company(&comp.name))
                .with_text("overlap", &comp.overlap_type),
        );
    }

    for detail in &market.competitor_details {
        for investor in &detail.key_investors {
            edge(EdgeSpec::new(
                EdgeKind::InvestedIn,
                NodeKey::investor(investor),
                NodeKey::company(&detail.name),
            ));
        }
    }

    for deal in &market.acquisitions {
        let acquired = NodeKey::company(&deal.target);
        edge(
            EdgeSpec::new(EdgeKind::Acquired, NodeKey::company(&deal.acquirer), acquired.clone())
                .with_opt("year", deal.year)
                .with_text("deal_size", &deal.deal_size)
                .with_text("implied_multiple", &deal.implied_multiple),
        );
        if let Some(key) = &market_key {
            if !blank(&deal.acquirer) {
                edge(EdgeSpec::new(EdgeKind::OperatesIn, acquired, key.clone()));
            }
        }
    }

    for partnership in &signals.partnerships {
        edge(
            EdgeSpec::new(
                EdgeKind::PartnersWith,
                company.clone(),
                NodeKey::company(&partnership.partner),
            )
            .with_text("type", &partnership.kind),
        );
    }

    writes
}

/// Plan and apply all writes for one run.
pub async fn build_graph(
    graph: &RelationshipGraph,
    target: &str,
    core: &CoreEntities,
    market: &MarketEntities,
    signals: &SignalEntities,
) -> BuildStats {
    let writes = plan_writes(target, core, market, signals);
    let mut stats = BuildStats {
        planned: writes.len(),
        ..Default::default()
    };

    if !graph.is_available() {
        info!("Graph unavailable, skipping construction");
        stats.skipped = writes.len();
        return stats;
    }

    for (i, write) in writes.iter().enumerate() {
        if !graph.is_available() {
            stats.skipped = writes.len() - i;
            break;
        }
        match graph.upsert(write).await {
            Ok(()) => {
                debug!(write = %write.describe(), "Graph write applied");
                stats.written += 1;
            }
            Err(e) => {
                warn!(write = %write.describe(), error = %e, "Graph write failed");
                stats.failed += 1;
            }
        }
    }

    info!(
        company = target,
        written = stats.written,
        failed = stats.failed,
        skipped = stats.skipped,
        "Graph construction complete"
    );
    stats
}
