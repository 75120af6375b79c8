use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use wk_core::{Analysis, Article, ArticleDraft, Gateway};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetailStatus {
    #[default]
    Idle,
    Loading,
    Ready,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Saved,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailState {
    /// External page identifier currently targeted.
    pub page_id: Option<String>,
    pub status: DetailStatus,
    pub article: Option<Article>,
    pub analysis: Option<Analysis>,
    pub save_status: SaveStatus,
    pub error_info: Option<String>,
}

struct DetailInner {
    gateway: Arc<dyn Gateway>,
    state: watch::Sender<DetailState>,
}

/// One article and its analysis, plus the save/update actions on it.
#[derive(Clone)]
pub struct DetailSession {
    inner: Arc<DetailInner>,
}

impl DetailSession {
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self {
            inner: Arc::new(DetailInner {
                gateway,
                state: watch::Sender::new(DetailState::default()),
            }),
        }
    }

    pub fn snapshot(&self) -> DetailState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DetailState> {
        self.inner.state.subscribe()
    }

    /// Current article, if loaded.
    pub fn article(&self) -> Option<Article> {
        self.inner.state.borrow().article.clone()
    }

    /// Fetches the article and analysis for `page_id`, replacing whatever
    /// was shown. A response for a page no longer targeted is ignored.
    ///
    /// Reloading a page whose save is still in flight keeps `Saving`; the
    /// pending create settles the save status.
    pub async fn load(&self, page_id: &str) -> DetailStatus {
        self.inner.state.send_modify(|s| {
            let saving = s.save_status == SaveStatus::Saving
                && s.page_id.as_deref() == Some(page_id);
            *s = DetailState {
                page_id: Some(page_id.to_string()),
                status: DetailStatus::Loading,
                save_status: if saving { SaveStatus::Saving } else { SaveStatus::Idle },
                ..DetailState::default()
            };
        });

        let result = self.inner.gateway.fetch_detail(page_id).await;

        self.inner.state.send_if_modified(|s| {
            if s.page_id.as_deref() != Some(page_id) {
                debug!("🗑️ Dropping detail for {} after navigation", page_id);
                return false;
            }
            match result {
                Ok(detail) => {
                    // A create that landed during the fetch beats an unsaved copy.
                    let saved_meanwhile = s.article.as_ref().is_some_and(Article::is_saved)
                        && !detail.article.is_saved();
                    if !saved_meanwhile {
                        if s.save_status != SaveStatus::Saving {
                            s.save_status = if detail.article.is_saved() {
                                SaveStatus::Saved
                            } else {
                                SaveStatus::Idle
                            };
                        }
                        s.article = Some(detail.article);
                    }
                    s.analysis = Some(detail.analysis);
                    s.status = DetailStatus::Ready;
                    s.error_info = None;
                }
                Err(e) => {
                    warn!("❌ Failed to load {}: {}", page_id, e);
                    s.status = DetailStatus::Error;
                    s.error_info = Some(e.to_string());
                }
            }
            true
        });
        self.inner.state.borrow().status
    }

    /// Persists the loaded article. Ignored unless the detail is ready and
    /// no save is in flight or done, so a double submit creates once.
    /// A failed save may be retried.
    pub async fn save(&self) -> SaveStatus {
        let mut draft = None;
        self.inner.state.send_if_modified(|s| {
            if s.status != DetailStatus::Ready
                || !matches!(s.save_status, SaveStatus::Idle | SaveStatus::Failed)
            {
                return false;
            }
            let (Some(article), Some(analysis)) = (&s.article, &s.analysis) else {
                return false;
            };
            if article.is_saved() {
                return false;
            }
            draft = Some(ArticleDraft::from_detail(article, analysis));
            s.save_status = SaveStatus::Saving;
            s.error_info = None;
            true
        });

        let Some(draft) = draft else {
            return self.inner.state.borrow().save_status;
        };

        let result = self.inner.gateway.create(&draft).await;

        self.inner.state.send_modify(|s| {
            let still_here = s.page_id.as_deref() == Some(draft.page_id.as_str());
            match result {
                Ok(article) if still_here => {
                    info!("💾 Saved {} as #{}", article.title, article.id);
                    s.article = Some(article);
                    s.save_status = SaveStatus::Saved;
                }
                Ok(article) => {
                    debug!("💾 Saved #{} after navigating away", article.id);
                }
                Err(e) if still_here => {
                    warn!("❌ Failed to save {}: {}", draft.page_id, e);
                    s.save_status = SaveStatus::Failed;
                    s.error_info = Some(e.to_string());
                }
                Err(e) => {
                    debug!("❌ Save of {} failed after navigating away: {}", draft.page_id, e);
                }
            }
        });
        self.inner.state.borrow().save_status
    }

    /// Replaces the held article with `updated` (for example after a notes
    /// patch). The analysis is left as is. Returns `false` if `updated` is not
    /// the article this session shows.
    pub fn apply_update(&self, updated: Article) -> bool {
        self.inner.state.send_if_modified(|s| {
            let matches = s
                .article
                .as_ref()
                .is_some_and(|current| current.page_id == updated.page_id);
            if !matches {
                return false;
            }
            if updated.is_saved() {
                s.save_status = SaveStatus::Saved;
            }
            s.article = Some(updated);
            true
        })
    }
}
