use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum CompetitivePosition {
    Strong,
    #[default]
    Moderate,
    Weak,
}

impl fmt::Display for CompetitivePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Strong => "Strong",
            Self::Moderate => "Moderate",
            Self::Weak => "Weak",
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum ExitTimeline {
    #[serde(rename = "Near-term")]
    NearTerm,
    #[default]
    Medium,
    Long,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum FlagSeverity {
    High,
    #[default]
    Medium,
    Low,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RedFlag {
    pub signal: String,
    pub severity: FlagSeverity,
    pub evidence: String,
    pub implication: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct CompTransaction {
    pub target: String,
    pub acquirer: String,
    pub year: Option<i32>,
    pub deal_size: String,
    pub implied_multiple: String,
    pub strategic_rationale: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct PotentialAcquirer {
    pub name: String,
    /// 1-10
    pub fit_score: i32,
    pub rationale: String,
    pub prior_acquisitions: i32,
    pub acquisition_history: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct ExitProbability {
    /// 1-10
    pub ipo_score: i32,
    pub ipo_reasoning: String,
    /// 1-10
    pub acquisition_score: i32,
    pub acquisition_reasoning: String,
    pub timeline: ExitTimeline,
}

/// Structured analysis over the three entity bundles plus graph insights.
/// `Default` is what a failed analysis call degrades to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AnalysisOutput {
    pub red_flags: Vec<RedFlag>,
    pub comps: Vec<CompTransaction>,
    pub exit_probability: ExitProbability,
    pub ranked_acquirers: Vec<PotentialAcquirer>,
    pub competitive_position: CompetitivePosition,
}
