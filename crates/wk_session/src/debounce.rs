use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Turns fast-changing input into committed values.
///
/// A value is emitted on the paired receiver only after `quiet` has passed
/// without another [`push`](Debouncer::push). Blank values cancel whatever is
/// pending and are never emitted. Dropping the debouncer cancels the pending
/// timer, so nothing is emitted after teardown.
#[derive(Debug)]
pub struct Debouncer {
    quiet: Duration,
    tx: mpsc::UnboundedSender<String>,
    pending: Option<JoinHandle<()>>,
}

impl Debouncer {
    pub fn new(quiet: Duration) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let debouncer = Self {
            quiet,
            tx,
            pending: None,
        };
        (debouncer, rx)
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet
    }

    /// Restarts the quiet period with `value` as the candidate.
    pub fn push(&mut self, value: impl Into<String>) {
        self.cancel();

        let value = value.into();
        if value.trim().is_empty() {
            return;
        }

        let tx = self.tx.clone();
        let quiet = self.quiet;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(quiet).await;
            debug!("⏱️ Committing {:?}", value);
            // The receiver may already be gone during teardown.
            let _ = tx.send(value);
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
