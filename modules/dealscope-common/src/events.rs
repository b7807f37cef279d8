//! Progress events streamed to the caller while a run is in flight.
//!
//! One `status` pair per phase (entry, then exit with elapsed seconds), one
//! `graph_ready` after graph construction, and exactly one terminal event.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::analysis::{
    CompTransaction, CompetitivePosition, ExitProbability, PotentialAcquirer, RedFlag,
};
use crate::entities::{CompanyInfo, MarketInfo};
use crate::insights::InvestorOverlap;

/// Number of pipeline phases reported in every status event.
pub const PHASE_COUNT: u8 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusIcon {
    Search,
    Brain,
    Graph,
    Chart,
    Document,
    Check,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub step: u8,
    pub total: u8,
    pub message: String,
    pub icon: StatusIcon,
    /// Seconds spent in the phase; only set on the exit event.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletePayload {
    pub elapsed_total: f64,
    pub memo: String,
    pub comps_table: Vec<CompTransaction>,
    pub red_flags: Vec<RedFlag>,
    pub exit_scores: ExitProbability,
    pub ranked_acquirers: Vec<PotentialAcquirer>,
    pub competitive_position: CompetitivePosition,
    pub company_info: CompanyInfo,
    pub market_info: MarketInfo,
    pub graph_stats: BTreeMap<String, u64>,
    pub investor_overlaps: Vec<InvestorOverlap>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    Status(StatusUpdate),
    GraphReady { graph_available: bool },
    Complete(Box<CompletePayload>),
    Error { message: String },
}

impl ProgressEvent {
    pub fn phase_started(step: u8, message: impl Into<String>, icon: StatusIcon) -> Self {
        Self::Status(StatusUpdate {
            step,
            total: PHASE_COUNT,
            message: message.into(),
            icon,
            elapsed: None,
        })
    }

    pub fn phase_finished(
        step: u8,
        message: impl Into<String>,
        icon: StatusIcon,
        elapsed: Duration,
    ) -> Self {
        Self::Status(StatusUpdate {
            step,
            total: PHASE_COUNT,
            message: message.into(),
            icon,
            elapsed: Some(round_tenths(elapsed)),
        })
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// SSE event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Status(_) => "status",
            Self::GraphReady { .. } => "graph_ready",
            Self::Complete(_) => "complete",
            Self::Error { .. } => "error",
        }
    }

    /// SSE data payload.
    pub fn data(&self) -> serde_json::Value {
        let value = match self {
            Self::Status(update) => serde_json::to_value(update),
            Self::GraphReady { graph_available } => {
                Ok(serde_json::json!({ "graphAvailable": graph_available }))
            }
            Self::Complete(payload) => serde_json::to_value(payload),
            Self::Error { message } => Ok(serde_json::json!({ "message": message })),
        };
        // Plain data structs with string keys; serialization cannot fail.
        value.unwrap_or(serde_json::Value::Null)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete(_) | Self::Error { .. })
    }
}

/// Round a duration to tenths of a second.
pub fn round_tenths(d: Duration) -> f64 {
    (d.as_secs_f64() * 10.0).round() / 10.0
}
