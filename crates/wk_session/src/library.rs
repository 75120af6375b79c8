use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use wk_core::{Article, Gateway};
use crate::mutation::MutationPhase;
use crate::pagination::{page_markers, PageMarker};
use crate::DEFAULT_PAGE_SIZE;

/// Extra fetches allowed when a reload lands past the last page.
const MAX_RECLAMP: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LibraryStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LibraryState {
    /// 1-based page index.
    pub page: u64,
    pub page_size: u64,
    pub items: Vec<Article>,
    /// Saved articles across all pages.
    pub total: u64,
    pub status: LibraryStatus,
    pub error_info: Option<String>,
    pub last_delete: MutationPhase,
    /// Set once a window has arrived, so `total` can bound the page.
    loaded: bool,
}

impl LibraryState {
    fn new(page_size: u64) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
            items: Vec::new(),
            total: 0,
            status: LibraryStatus::Idle,
            error_info: None,
            last_delete: MutationPhase::Idle,
            loaded: false,
        }
    }

    pub fn page_count(&self) -> u64 {
        self.total.div_ceil(self.page_size).max(1)
    }

    pub fn clamp_page(&self, page: u64) -> u64 {
        page.clamp(1, self.page_count())
    }

    pub fn page_markers(&self) -> Vec<PageMarker> {
        page_markers(self.page_count(), self.page)
    }

    /// Loads and deletes are refused while either is in flight.
    fn is_busy(&self) -> bool {
        self.status == LibraryStatus::Loading || self.last_delete.is_pending()
    }

    /// Moves to `page` and marks the window as loading. Returns the page and
    /// its offset. Before the first window only the lower bound applies; the
    /// reply's total moves an out-of-range page back.
    fn begin_fetch(&mut self, page: u64) -> (u64, u64) {
        let page = if self.loaded {
            self.clamp_page(page)
        } else {
            page.max(1)
        };
        self.page = page;
        self.status = LibraryStatus::Loading;
        self.error_info = None;
        (page, (page - 1) * self.page_size)
    }
}

struct LibraryInner {
    gateway: Arc<dyn Gateway>,
    state: watch::Sender<LibraryState>,
}

/// A fixed-size window over the saved articles.
///
/// Windows are always replaced wholesale from the server. Deletes are
/// optimistic: the item leaves the window at once and comes back in place if
/// the remote refuses.
#[derive(Clone)]
pub struct LibrarySession {
    inner: Arc<LibraryInner>,
}

impl LibrarySession {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self::with_page_size(gateway, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(gateway: Arc<dyn Gateway>, page_size: u64) -> Self {
        Self {
            inner: Arc::new(LibraryInner {
                gateway,
                state: watch::Sender::new(LibraryState::new(page_size)),
            }),
        }
    }

    pub fn snapshot(&self) -> LibraryState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LibraryState> {
        self.inner.state.subscribe()
    }

    /// Loads `page`, clamped to the known page range. Returns `false` if
    /// refused because a load or delete is in flight.
    pub async fn load_page(&self, page: u64) -> bool {
        let mut target = None;
        self.inner.state.send_if_modified(|s| {
            if s.is_busy() {
                return false;
            }
            target = Some(s.begin_fetch(page));
            true
        });
        match target {
            Some((page, offset)) => {
                self.fetch(page, offset).await;
                true
            }
            None => {
                debug!("⏳ Library busy, ignoring load of page {}", page);
                false
            }
        }
    }

    /// Reloads the current page, e.g. to retry after an error.
    pub async fn reload(&self) -> bool {
        let page = self.inner.state.borrow().page;
        self.load_page(page).await
    }

    pub async fn next_page(&self) -> bool {
        let (page, count) = {
            let s = self.inner.state.borrow();
            (s.page, s.page_count())
        };
        page < count && self.load_page(page + 1).await
    }

    pub async fn prev_page(&self) -> bool {
        let page = self.inner.state.borrow().page;
        page > 1 && self.load_page(page - 1).await
    }

    /// Removes `id` from the window, then deletes it remotely.
    ///
    /// On success the window is reloaded from the server: the previous page
    /// if the removal emptied this one (and it is not the first), the current
    /// page otherwise. A remote "not found" counts as success. Any other
    /// failure puts the item back at its original index and skips the reload.
    pub async fn delete_item(&self, id: i64) -> MutationPhase {
        let mut removed = None;
        self.inner.state.send_if_modified(|s| {
            if s.is_busy() {
                return false;
            }
            let Some(index) = s.items.iter().position(|a| a.id == id) else {
                return false;
            };
            let article = s.items.remove(index);
            s.last_delete = MutationPhase::Pending { id };
            s.error_info = None;
            removed = Some((index, article, s.items.is_empty(), s.page));
            true
        });

        let Some((index, article, emptied, page)) = removed else {
            debug!("🗑️ Ignoring delete of #{}: not on this page or library busy", id);
            return self.inner.state.borrow().last_delete;
        };

        match self.inner.gateway.delete(id).await {
            Err(e) if !e.is_not_found() => {
                warn!("↩️ Delete of #{} failed, restoring it: {}", id, e);
                self.inner.state.send_modify(|s| {
                    let index = index.min(s.items.len());
                    s.items.insert(index, article);
                    s.last_delete = MutationPhase::RolledBack { id };
                    s.error_info = Some(e.to_string());
                });
                MutationPhase::RolledBack { id }
            }
            result => {
                if let Err(e) = result {
                    debug!("🗑️ #{} was already gone: {}", id, e);
                }
                info!("🗑️ Deleted #{}", id);
                let target = if emptied && page > 1 { page - 1 } else { page };
                let mut fetch = (target, 0);
                self.inner.state.send_modify(|s| {
                    s.last_delete = MutationPhase::Committed { id };
                    fetch = s.begin_fetch(target);
                });
                self.fetch(fetch.0, fetch.1).await;
                MutationPhase::Committed { id }
            }
        }
    }

    /// Requests a window and installs it. If the new total leaves the page
    /// past the end, moves to the last page and fetches again.
    async fn fetch(&self, mut page: u64, mut offset: u64) {
        let page_size = self.inner.state.borrow().page_size;
        for attempt in 0..=MAX_RECLAMP {
            let result = self.inner.gateway.list_page(offset, page_size).await;
            let mut refetch = None;
            self.inner.state.send_modify(|s| match result {
                Ok(window) => {
                    s.items = window.items;
                    s.total = window.total;
                    s.status = LibraryStatus::Ready;
                    s.loaded = true;
                    if page > s.page_count() && attempt < MAX_RECLAMP {
                        refetch = Some(s.begin_fetch(page));
                    }
                }
                Err(e) => {
                    warn!("❌ Failed to load page {}: {}", page, e);
                    s.status = LibraryStatus::Error;
                    s.error_info = Some(e.to_string());
                }
            });
            match refetch {
                Some((next_page, next_offset)) => {
                    debug!("📚 Page {} is past the end, moving to {}", page, next_page);
                    page = next_page;
                    offset = next_offset;
                }
                None => return,
            }
        }
    }
}
