use crate::wave::RoundOutput;
use dealscope_graph::BuildStats;

/// Counters for one pipeline run, logged when the run ends.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub queries_issued: usize,
    pub queries_failed: usize,
    pub sources_kept: usize,
    pub sources_deduplicated: usize,
    pub graph_writes_ok: usize,
    pub graph_writes_failed: usize,
    pub graph_writes_skipped: usize,
    /// Phases whose gateway call failed and fell back to a default.
    pub degraded_phases: Vec<&'static str>,
}

impl RunStats {
    pub fn record_round(&mut self, round: &RoundOutput) {
        self.queries_issued += round.queries_issued;
        self.queries_failed += round.queries_failed;
        self.sources_kept += round.results.len();
        self.sources_deduplicated += round.duplicates_dropped;
    }

    pub fn record_graph(&mut self, build: &BuildStats) {
        self.graph_writes_ok += build.written;
        self.graph_writes_failed += build.failed;
        self.graph_writes_skipped += build.skipped;
    }

    pub fn degraded(&mut self, phase: &'static str) {
        self.degraded_phases.push(phase);
    }
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "\n=== Pipeline Run Complete ===")?;
        writeln!(f, "Queries issued:     {}", self.queries_issued)?;
        writeln!(f, "Queries failed:     {}", self.queries_failed)?;
        writeln!(f, "Sources kept:       {}", self.sources_kept)?;
        writeln!(f, "Sources deduped:    {}", self.sources_deduplicated)?;
        writeln!(f, "Graph writes ok:    {}", self.graph_writes_ok)?;
        writeln!(f, "Graph writes failed:{}", self.graph_writes_failed)?;
        writeln!(f, "Graph writes skipped:{}", self.graph_writes_skipped)?;
        if self.degraded_phases.is_empty() {
            write!(f, "Degraded phases:    none")
        } else {
            write!(f, "Degraded phases:    {}", self.degraded_phases.join(", "))
        }
    }
}
