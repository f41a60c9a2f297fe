//! Debounced "have I already applied?" lookup.
//!
//! Each schedule bumps a generation counter and aborts the previous task,
//! so only the most recent email can ever produce a visible result.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::api::JobsBackend;
use crate::error::ClientError;

pub const DEBOUNCE: Duration = Duration::from_millis(400);

#[derive(Debug)]
pub struct CheckResult {
    pub generation: u64,
    pub email: String,
    pub outcome: Result<bool, ClientError>,
}

#[derive(Debug)]
pub struct DuplicateCheck {
    delay: Duration,
    generation: u64,
    pending: Option<JoinHandle<()>>,
    tx: mpsc::UnboundedSender<CheckResult>,
    rx: mpsc::UnboundedReceiver<CheckResult>,
}

impl Default for DuplicateCheck {
    fn default() -> Self {
        Self::new(DEBOUNCE)
    }
}

impl DuplicateCheck {
    pub fn new(delay: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            delay,
            generation: 0,
            pending: None,
            tx,
            rx,
        }
    }

    #[cfg(test)]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Supersedes any pending check. Must run inside a tokio runtime.
    pub fn schedule<B>(&mut self, backend: Arc<B>, link_id: &str, email: &str) -> u64
    where
        B: JobsBackend + Send + Sync + 'static,
    {
        self.cancel();
        let generation = self.generation;
        let delay = self.delay;
        let tx = self.tx.clone();
        let link_id = link_id.to_string();
        let email = email.to_string();

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tracing::debug!("duplicate check #{} for {}", generation, email);
            let outcome = backend.has_applied(&link_id, &email).await;
            // receiver gone means the form was torn down
            let _ = tx.send(CheckResult {
                generation,
                email,
                outcome,
            });
        }));
        generation
    }

    /// Invalidates whatever is pending; its result will never be returned.
    pub fn cancel(&mut self) {
        self.generation += 1;
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    fn accept(&mut self, result: CheckResult) -> Option<CheckResult> {
        if result.generation != self.generation {
            tracing::debug!("dropping stale duplicate check #{}", result.generation);
            return None;
        }
        self.pending = None;
        Some(result)
    }

    /// Non-blocking: the latest finished result, if any. Stale ones are
    /// discarded on the way.
    pub fn try_take(&mut self) -> Option<CheckResult> {
        let mut latest = None;
        while let Ok(result) = self.rx.try_recv() {
            if let Some(result) = self.accept(result) {
                latest = Some(result);
            }
        }
        latest
    }

    /// Waits for the current generation's result. Returns None right away
    /// if nothing is pending.
    pub async fn next(&mut self) -> Option<CheckResult> {
        while self.pending.is_some() {
            let result = self.rx.recv().await?;
            if let Some(result) = self.accept(result) {
                return Some(result);
            }
        }
        None
    }
}

impl Drop for DuplicateCheck {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
