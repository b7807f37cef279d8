use thiserror::Error;

#[derive(Error, Debug)]
pub enum DealScopeError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Search error: {0}")]
    Search(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
