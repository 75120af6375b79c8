use async_trait::async_trait;
use crate::Result;

/// Durable local key-value state that outlives a session.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Last write wins.
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}
