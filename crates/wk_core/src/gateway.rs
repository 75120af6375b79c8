use async_trait::async_trait;
use crate::types::{Article, ArticleDetail, ArticleDraft, ArticlePage, ArticlePatch, ResultSet};
use crate::Result;

/// The remote article service. Implementations shape requests and normalize
/// failures; they hold no session state and cache nothing.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Full-text search. `query` must be non-blank.
    async fn search(&self, query: &str) -> Result<ResultSet>;

    /// Article plus computed analysis for an external page identifier.
    async fn fetch_detail(&self, page_id: &str) -> Result<ArticleDetail>;

    /// Persist a new article; returns it with its assigned id.
    async fn create(&self, draft: &ArticleDraft) -> Result<Article>;

    /// One window of saved articles together with the collection total.
    async fn list_page(&self, offset: u64, limit: u64) -> Result<ArticlePage>;

    /// Apply a partial update and echo back the full updated article.
    async fn patch(&self, id: i64, patch: &ArticlePatch) -> Result<Article>;

    async fn delete(&self, id: i64) -> Result<()>;
}
