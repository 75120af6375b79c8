use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use wk_core::{Article, ArticlePatch, Error, Gateway};
use crate::detail::DetailSession;
use crate::mutation::MutationPhase;

/// Draft notes for one saved article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEdit {
    pub article_id: i64,
    pub draft: String,
    pub dirty: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NotesState {
    /// `Some` while in edit mode.
    pub edit: Option<PendingEdit>,
    pub confirm: MutationPhase,
    pub error_info: Option<String>,
}

impl NotesState {
    pub fn is_editing(&self) -> bool {
        self.edit.is_some()
    }
}

struct NotesInner {
    gateway: Arc<dyn Gateway>,
    owner: DetailSession,
    state: watch::Sender<NotesState>,
}

/// Short-lived edit buffer for the personal notes of the article shown by a
/// [`DetailSession`]. A confirmed edit is written back into that session.
#[derive(Clone)]
pub struct NotesEditor {
    inner: Arc<NotesInner>,
}

impl NotesEditor {
    pub fn new(gateway: Arc<dyn Gateway>, owner: DetailSession) -> Self {
        Self {
            inner: Arc::new(NotesInner {
                gateway,
                owner,
                state: watch::Sender::new(NotesState::default()),
            }),
        }
    }

    pub fn snapshot(&self) -> NotesState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<NotesState> {
        self.inner.state.subscribe()
    }

    /// Enters edit mode seeded with the article's current notes. Only saved
    /// articles carry notes.
    pub fn begin(&self, article: &Article) -> bool {
        self.inner.state.send_if_modified(|s| {
            if s.confirm.is_pending() {
                return false;
            }
            if !article.is_saved() {
                s.edit = None;
                s.error_info = Some(
                    Error::Validation("Save the article before adding notes".to_string()).to_string(),
                );
                return true;
            }
            s.edit = Some(PendingEdit {
                article_id: article.id,
                draft: article.notes().to_string(),
                dirty: false,
            });
            s.confirm = MutationPhase::Idle;
            s.error_info = None;
            true
        });
        self.inner.state.borrow().is_editing()
    }

    /// [`begin`](Self::begin) with the owning session's current article.
    pub fn begin_current(&self) -> bool {
        match self.inner.owner.article() {
            Some(article) => self.begin(&article),
            None => false,
        }
    }

    pub fn set_draft(&self, text: &str) -> bool {
        self.inner.state.send_if_modified(|s| {
            if s.confirm.is_pending() {
                return false;
            }
            match s.edit.as_mut() {
                Some(edit) => {
                    edit.draft = text.to_string();
                    edit.dirty = true;
                    true
                }
                None => false,
            }
        })
    }

    /// Leaves edit mode, discarding the draft.
    pub fn cancel(&self) -> bool {
        self.inner.state.send_if_modified(|s| {
            if s.confirm.is_pending() || s.edit.is_none() {
                return false;
            }
            s.edit = None;
            s.error_info = None;
            true
        })
    }

    /// Sends the draft. On success the returned article replaces the owner's
    /// copy and edit mode ends; on failure the draft stays for a retry.
    pub async fn confirm(&self) -> MutationPhase {
        let mut pending = None;
        self.inner.state.send_if_modified(|s| {
            if s.confirm.is_pending() {
                return false;
            }
            let Some(edit) = &s.edit else {
                return false;
            };
            pending = Some((edit.article_id, edit.draft.clone()));
            s.confirm = MutationPhase::Pending { id: edit.article_id };
            s.error_info = None;
            true
        });

        let Some((id, draft)) = pending else {
            return self.inner.state.borrow().confirm;
        };

        match self.inner.gateway.patch(id, &ArticlePatch::notes(draft)).await {
            Ok(article) => {
                info!("📝 Notes saved for #{}", id);
                self.inner.owner.apply_update(article);
                self.inner.state.send_modify(|s| {
                    s.edit = None;
                    s.confirm = MutationPhase::Committed { id };
                });
                MutationPhase::Committed { id }
            }
            Err(e) => {
                warn!("❌ Failed to save notes for #{}: {}", id, e);
                self.inner.state.send_modify(|s| {
                    s.confirm = MutationPhase::RolledBack { id };
                    s.error_info = Some(e.to_string());
                });
                MutationPhase::RolledBack { id }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wk_gateway::{InMemoryGateway, Operation};

    async fn saved_detail(gateway: &Arc<InMemoryGateway>) -> DetailSession {
        gateway.seed_saved("18839").await.unwrap();
        gateway
            .patch(1, &ArticlePatch::notes("original"))
            .await
            .unwrap();
        let detail = DetailSession::new(gateway.clone());
        detail.load("18839").await;
        detail
    }

    #[tokio::test]
    async fn test_begin_then_cancel_leaves_notes_unchanged() {
        let gateway = Arc::new(InMemoryGateway::with_sample_catalog());
        let detail = saved_detail(&gateway).await;
        let editor = NotesEditor::new(gateway.clone(), detail.clone());

        assert!(editor.begin_current());
        let edit = editor.snapshot().edit.unwrap();
        assert_eq!(edit.draft, "original");
        assert!(!edit.dirty);

        editor.set_draft("scribbles");
        assert!(editor.snapshot().edit.unwrap().dirty);
        assert!(editor.cancel());

        assert!(!editor.snapshot().is_editing());
        assert_eq!(detail.article().unwrap().notes(), "original");
        assert_eq!(gateway.calls(Operation::Patch).await, 1);
    }

    #[tokio::test]
    async fn test_confirm_promotes_draft_into_detail() {
        let gateway = Arc::new(InMemoryGateway::with_sample_catalog());
        let detail = saved_detail(&gateway).await;
        let editor = NotesEditor::new(gateway.clone(), detail.clone());
        let analysis = detail.snapshot().analysis;

        editor.begin_current();
        editor.set_draft("Eight arms,\nthree hearts.");
        assert_eq!(editor.confirm().await, MutationPhase::Committed { id: 1 });

        assert!(!editor.snapshot().is_editing());
        assert_eq!(detail.article().unwrap().notes(), "Eight arms,\nthree hearts.");
        assert_eq!(detail.snapshot().analysis, analysis);
    }

    #[tokio::test]
    async fn test_failed_confirm_keeps_draft_for_retry() {
        let gateway = Arc::new(InMemoryGateway::with_sample_catalog());
        let detail = saved_detail(&gateway).await;
        let editor = NotesEditor::new(gateway.clone(), detail.clone());

        editor.begin_current();
        editor.set_draft("keep me");
        gateway
            .fail_next(Operation::Patch, Error::Transport("timed out".to_string()))
            .await;
        assert_eq!(editor.confirm().await, MutationPhase::RolledBack { id: 1 });

        let state = editor.snapshot();
        assert_eq!(state.edit.unwrap().draft, "keep me");
        assert_eq!(state.error_info.as_deref(), Some("Transport error: timed out"));
        assert_eq!(detail.article().unwrap().notes(), "original");

        assert_eq!(editor.confirm().await, MutationPhase::Committed { id: 1 });
        assert_eq!(detail.article().unwrap().notes(), "keep me");
    }

    #[tokio::test]
    async fn test_unsaved_article_cannot_be_annotated() {
        let gateway = Arc::new(InMemoryGateway::with_sample_catalog());
        let detail = DetailSession::new(gateway.clone());
        detail.load("6678").await;
        let editor = NotesEditor::new(gateway.clone(), detail.clone());

        assert!(!editor.begin_current());
        let state = editor.snapshot();
        assert!(state.error_info.unwrap().starts_with("Validation error"));
        assert_eq!(editor.confirm().await, MutationPhase::Idle);
        assert_eq!(gateway.calls(Operation::Patch).await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_confirm_in_flight_blocks_edits() {
        let gateway = Arc::new(InMemoryGateway::with_sample_catalog());
        let detail = saved_detail(&gateway).await;
        gateway.set_latency(Operation::Patch, Duration::from_millis(200)).await;
        let editor = NotesEditor::new(gateway.clone(), detail.clone());
        editor.begin_current();
        editor.set_draft("first");

        let mut rx = editor.subscribe();
        let confirming = tokio::spawn({
            let editor = editor.clone();
            async move { editor.confirm().await }
        });
        rx.wait_for(|s| s.confirm.is_pending()).await.unwrap();

        assert!(!editor.set_draft("second"));
        assert!(!editor.cancel());
        assert_eq!(editor.confirm().await, MutationPhase::Pending { id: 1 });

        assert_eq!(confirming.await.unwrap(), MutationPhase::Committed { id: 1 });
        assert_eq!(detail.article().unwrap().notes(), "first");
        // One patch from setup, one from the confirm.
        assert_eq!(gateway.calls(Operation::Patch).await, 2);
    }
}
