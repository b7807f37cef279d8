use thiserror::Error;

/// Failures that end a run. Everything else degrades to a default value.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A gateway worker task panicked or was cancelled.
    #[error("{phase} worker failed: {reason}")]
    WorkerFailed { phase: &'static str, reason: String },

    /// The progress consumer went away; the run is abandoned.
    #[error("progress consumer disconnected")]
    Disconnected,
}
