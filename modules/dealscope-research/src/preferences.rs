use anyhow::Result;
use async_trait::async_trait;

/// Free-text analyst preferences appended to the memo instructions.
#[async_trait]
pub trait PreferenceSource: Send + Sync {
    /// Empty when nothing is stored.
    async fn memo_preferences(&self) -> Result<String>;
}

/// No preference store configured.
pub struct NoPreferences;

#[async_trait]
impl PreferenceSource for NoPreferences {
    async fn memo_preferences(&self) -> Result<String> {
        Ok(String::new())
    }
}
