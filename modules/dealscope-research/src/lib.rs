pub mod analysis;
pub mod error;
pub mod extraction;
pub mod orchestrator;
pub mod preferences;
pub mod search;
pub mod stats;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod wave;

pub use analysis::{Analyst, LlmAnalyst, MemoRequest};
pub use error::PipelineError;
pub use extraction::{EntityExtractor, LlmExtractor};
pub use orchestrator::{Pipeline, PipelineDeps, RunOutcome, RunRequest};
pub use preferences::{NoPreferences, PreferenceSource};
pub use search::{
    SearchQuery, SearchResponse, SearchResult, SearchTopic, TavilySearcher, WebSearcher,
    SEARCH_TIMEOUT,
};
pub use stats::RunStats;
pub use wave::{format_for_extraction, RoundOutput, SeenSources, WaveSearchEngine};
