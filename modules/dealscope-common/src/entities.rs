//! Entity bundles produced by the three extraction rounds.
//!
//! Every type doubles as a strict structured-output schema, so every field
//! is always present on the wire; `#[serde(default)]` keeps deserialization
//! tolerant of models that drop keys anyway. `Default` is the zero-value
//! bundle a failed extraction degrades to.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// --- Company (round 1) ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CompanyInfo {
    pub name: String,
    pub sector: String,
    pub sub_sector: String,
    pub founded_year: Option<i32>,
    pub hq_location: String,
    pub description: String,
    pub business_model: String,
    pub key_products: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Founder {
    pub name: String,
    pub role: String,
    pub background: String,
    pub prior_companies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Investor {
    pub name: String,
    /// VC, PE, Corporate, Angel or Unknown
    #[serde(rename = "type")]
    pub kind: String,
    pub rounds_participated: Vec<String>,
    pub is_lead: bool,
}

impl Default for Investor {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: "Unknown".to_string(),
            rounds_participated: Vec::new(),
            is_lead: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Funding {
    pub total_raised: String,
    pub last_round: String,
    pub last_round_amount: String,
    pub last_valuation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Traction {
    pub estimated_revenue: String,
    pub revenue_model: String,
    pub notable_customers: Vec<String>,
    pub employee_count: String,
    pub growth_signals: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Competitor {
    pub name: String,
    /// direct, adjacent or emerging
    pub overlap_type: String,
    pub differentiator: String,
    pub estimated_funding: String,
}

impl Default for Competitor {
    fn default() -> Self {
        Self {
            name: String::new(),
            overlap_type: "direct".to_string(),
            differentiator: String::new(),
            estimated_funding: String::new(),
        }
    }
}

// --- Market / M&A (round 2) ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct MarketInfo {
    pub name: String,
    pub tam: String,
    pub growth_rate: String,
    pub key_trends: Vec<String>,
    pub adjacent_markets: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Acquisition {
    pub target: String,
    pub acquirer: String,
    pub year: Option<i32>,
    pub deal_size: String,
    pub implied_multiple: String,
    pub strategic_rationale: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CompetitorDetail {
    pub name: String,
    pub total_funding: String,
    pub key_investors: Vec<String>,
    pub estimated_revenue: String,
}

// --- Signals (round 3) ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RiskSignal {
    pub signal: String,
    /// low, medium or high
    pub severity: String,
    pub source: String,
    pub detail: String,
}

impl Default for RiskSignal {
    fn default() -> Self {
        Self {
            signal: String::new(),
            severity: "medium".to_string(),
            source: String::new(),
            detail: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Partnership {
    pub partner: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub significance: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ExitSignals {
    pub ipo_indicators: Vec<String>,
    pub acquisition_indicators: Vec<String>,
    pub sector_exit_activity: String,
}

// --- Bundles (one per extraction round) ---

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CoreEntities {
    pub company: CompanyInfo,
    pub founders: Vec<Founder>,
    pub investors: Vec<Investor>,
    pub funding: Funding,
    pub traction: Traction,
    pub competitors: Vec<Competitor>,
}

impl CoreEntities {
    /// Names of the first `limit` competitors with a usable name.
    pub fn competitor_names(&self, limit: usize) -> Vec<String> {
        named(self.competitors.iter().map(|c| c.name.as_str()), limit)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct MarketEntities {
    pub market: MarketInfo,
    pub acquisitions: Vec<Acquisition>,
    pub competitor_details: Vec<CompetitorDetail>,
}

impl MarketEntities {
    /// Acquirer names in extraction order, first `limit` distinct.
    pub fn top_acquirer_names(&self, limit: usize) -> Vec<String> {
        named(self.acquisitions.iter().map(|a| a.acquirer.as_str()), limit)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct SignalEntities {
    pub risk_signals: Vec<RiskSignal>,
    pub partnerships: Vec<Partnership>,
    pub exit_signals: ExitSignals,
}

fn named<'a>(names: impl Iterator<Item = &'a str>, limit: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in names.map(str::trim).filter(|n| !n.is_empty()) {
        if out.len() == limit {
            break;
        }
        if !out.iter().any(|seen| seen == name) {
            out.push(name.to_string());
        }
    }
    out
}
