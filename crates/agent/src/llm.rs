use anyhow::Result;
use async_trait::async_trait;

/// Chat-completion backend. Implementations own transport, retries and timeouts.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}
