use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use wk_core::{Gateway, KeyValueStore, ResultSet};

/// Store key holding the last query typed by the user.
pub const LAST_QUERY_KEY: &str = "lastSearchTerm";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchStatus {
    #[default]
    Idle,
    Searching,
    Success,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    /// What the user typed, shown as-is.
    pub query_text: String,
    pub status: SearchStatus,
    /// Last successful results. Kept on error so they can still be shown.
    pub result_set: Option<ResultSet>,
    pub error_info: Option<String>,
}

struct SearchInner {
    gateway: Arc<dyn Gateway>,
    store: Arc<dyn KeyValueStore>,
    /// Sequence number of the most recent commit.
    issued: AtomicU64,
    state: watch::Sender<SearchState>,
}

/// Query text, search status and the latest applicable results.
///
/// Every commit is fenced with a sequence number; a response is applied only
/// if no newer commit was issued while it was in flight.
#[derive(Clone)]
pub struct SearchSession {
    inner: Arc<SearchInner>,
}

impl SearchSession {
    /// Builds the session and, if a previous query was persisted, restores it
    /// and starts searching for it in the background.
    pub async fn new(gateway: Arc<dyn Gateway>, store: Arc<dyn KeyValueStore>) -> Self {
        let persisted = match store.get(LAST_QUERY_KEY).await {
            Ok(query) => query,
            Err(e) => {
                warn!("⚠️ Could not read last search query: {}", e);
                None
            }
        };

        let session = Self {
            inner: Arc::new(SearchInner {
                gateway,
                store,
                issued: AtomicU64::new(0),
                state: watch::Sender::new(SearchState::default()),
            }),
        };

        if let Some(query) = persisted.filter(|q| !q.trim().is_empty()) {
            info!("🔁 Restoring last search {:?}", query);
            session.inner.state.send_modify(|s| s.query_text = query.clone());
            if let Some(seq) = session.begin_commit(&query) {
                let restored = session.clone();
                tokio::spawn(async move {
                    restored.finish_commit(seq, query).await;
                });
            }
        }

        session
    }

    pub fn snapshot(&self) -> SearchState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.inner.state.subscribe()
    }

    /// Updates the displayed query and persists it. Does not search.
    pub async fn set_query(&self, text: &str) {
        self.inner.state.send_if_modified(|s| {
            if s.query_text == text {
                return false;
            }
            s.query_text = text.to_string();
            true
        });
        if let Err(e) = self.inner.store.set(LAST_QUERY_KEY, text).await {
            warn!("⚠️ Could not persist search query: {}", e);
        }
    }

    /// Runs a search for `text`. Blank text clears the results instead.
    ///
    /// Returns `true` if the outcome was applied, `false` if a newer commit
    /// superseded this one while it was in flight.
    pub async fn commit(&self, text: &str) -> bool {
        match self.begin_commit(text) {
            Some(seq) => self.finish_commit(seq, text.to_string()).await,
            None => true,
        }
    }

    /// Spawns a commit for every value received, typically from a
    /// [`Debouncer`](crate::Debouncer). Commits run concurrently so a slow
    /// search never delays a newer one.
    pub fn drive(&self, mut committed: mpsc::UnboundedReceiver<String>) -> JoinHandle<()> {
        let session = self.clone();
        tokio::spawn(async move {
            while let Some(text) = committed.recv().await {
                let session = session.clone();
                tokio::spawn(async move {
                    session.commit(&text).await;
                });
            }
        })
    }

    /// Stamps a new sequence number. Blank text resets to idle on the spot and
    /// yields no request; its stamp still fences off older responses.
    fn begin_commit(&self, text: &str) -> Option<u64> {
        let mut seq = None;
        self.inner.state.send_modify(|s| {
            let stamp = self.inner.issued.fetch_add(1, Ordering::SeqCst) + 1;
            if text.trim().is_empty() {
                s.status = SearchStatus::Idle;
                s.result_set = None;
                s.error_info = None;
            } else {
                s.status = SearchStatus::Searching;
                s.error_info = None;
                seq = Some(stamp);
            }
        });
        seq
    }

    async fn finish_commit(&self, seq: u64, text: String) -> bool {
        debug!("🔎 Search #{} for {:?}", seq, text);
        let result = self.inner.gateway.search(&text).await;

        let applied = self.inner.state.send_if_modified(|s| {
            if self.inner.issued.load(Ordering::SeqCst) != seq {
                return false;
            }
            match result {
                Ok(results) => {
                    s.status = SearchStatus::Success;
                    s.result_set = Some(results);
                    s.error_info = None;
                }
                Err(e) => {
                    s.status = SearchStatus::Error;
                    s.error_info = Some(e.to_string());
                }
            }
            true
        });

        if !applied {
            debug!("🗑️ Dropping stale response #{} for {:?}", seq, text);
        }
        applied
    }
}
