pub mod error;
pub mod gateway;
pub mod storage;
pub mod types;

pub use error::{Error, Result};
pub use gateway::Gateway;
pub use storage::KeyValueStore;
pub use types::*;

pub mod prelude {
    pub use crate::{Error, Gateway, KeyValueStore, Result};
    pub use crate::types::{Analysis, Article, ArticleDetail, ArticleDraft, ArticlePage, ArticlePatch, ResultSet};
}
