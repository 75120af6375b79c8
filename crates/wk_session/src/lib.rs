//! Client-side state for searching, viewing and curating saved articles.
//!
//! Each session is a cheap `Clone` handle. State lives behind a
//! [`tokio::sync::watch`] channel: callers either take a `snapshot()` or
//! `subscribe()` and rerender on change. Session operations never return
//! errors; failures land in the session state as `error_info`.

use std::time::Duration;

pub mod debounce;
pub mod detail;
pub mod library;
pub mod mutation;
pub mod notes;
pub mod pagination;
pub mod search;

pub use debounce::Debouncer;
pub use detail::{DetailSession, DetailState, DetailStatus, SaveStatus};
pub use library::{LibrarySession, LibraryState, LibraryStatus};
pub use mutation::MutationPhase;
pub use notes::{NotesEditor, NotesState, PendingEdit};
pub use pagination::{page_markers, PageMarker};
pub use search::{SearchSession, SearchState, SearchStatus, LAST_QUERY_KEY};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(500);
pub const DEFAULT_PAGE_SIZE: u64 = 6;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Quiet period before typed input commits a search.
    pub debounce: Duration,
    /// Saved articles per library page.
    pub page_size: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

pub mod prelude {
    pub use super::{
        DetailSession, Debouncer, LibrarySession, NotesEditor, SearchSession, SessionConfig,
    };
    pub use wk_core::{Article, Error, Gateway, KeyValueStore, Result};
}
