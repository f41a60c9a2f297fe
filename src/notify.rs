use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Local};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub created_at: DateTime<Local>,
}

/// Transient user-facing messages (toasts).
pub trait Notifier {
    fn notify(&self, level: NoticeLevel, message: &str);

    fn success(&self, message: &str) {
        self.notify(NoticeLevel::Success, message);
    }

    fn info(&self, message: &str) {
        self.notify(NoticeLevel::Info, message);
    }

    fn error(&self, message: &str) {
        self.notify(NoticeLevel::Error, message);
    }
}

/// Blocking yes/no question asked before destructive actions.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

// --- Toast queue (TUI) ---

const TOAST_LIFETIME_SECS: i64 = 4;
const TOAST_CAPACITY: usize = 5;

/// Shared queue of recent notices; the TUI draws whatever has not expired.
#[derive(Debug, Clone, Default)]
pub struct ToastQueue {
    inner: Arc<Mutex<VecDeque<Notice>>>,
}

impl ToastQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops expired notices and returns the live ones, oldest first.
    pub fn live(&self, now: DateTime<Local>) -> Vec<Notice> {
        let Ok(mut queue) = self.inner.lock() else {
            return Vec::new();
        };
        let lifetime = Duration::seconds(TOAST_LIFETIME_SECS);
        queue.retain(|n| now - n.created_at < lifetime);
        queue.iter().cloned().collect()
    }

    #[cfg(test)]
    pub fn messages(&self) -> Vec<(NoticeLevel, String)> {
        self.inner
            .lock()
            .map(|q| q.iter().map(|n| (n.level, n.message.clone())).collect())
            .unwrap_or_default()
    }
}

impl Notifier for ToastQueue {
    fn notify(&self, level: NoticeLevel, message: &str) {
        tracing::debug!("notice ({:?}): {}", level, message);
        if let Ok(mut queue) = self.inner.lock() {
            if queue.len() == TOAST_CAPACITY {
                queue.pop_front();
            }
            queue.push_back(Notice {
                level,
                message: message.to_string(),
                created_at: Local::now(),
            });
        }
    }
}

// --- Console (non-interactive commands) ---

pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, level: NoticeLevel, message: &str) {
        match level {
            NoticeLevel::Error => eprintln!("{}", message),
            NoticeLevel::Success | NoticeLevel::Info => println!("{}", message),
        }
    }
}

pub struct PromptConfirm;

impl Confirm for PromptConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}

/// `--yes`: every confirmation is granted.
pub struct AssumeYes;

impl Confirm for AssumeYes {
    fn confirm(&self, _prompt: &str) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toasts_expire() {
        let toasts = ToastQueue::new();
        toasts.success("saved");
        let now = Local::now();
        assert_eq!(toasts.live(now).len(), 1);
        assert!(toasts.live(now + Duration::seconds(10)).is_empty());
        assert!(toasts.messages().is_empty());
    }

    #[test]
    fn test_toast_capacity() {
        let toasts = ToastQueue::new();
        for i in 0..8 {
            toasts.info(&format!("n{i}"));
        }
        let messages = toasts.messages();
        assert_eq!(messages.len(), TOAST_CAPACITY);
        assert_eq!(messages[0].1, "n3");
    }

    #[test]
    fn test_clones_share_queue() {
        let toasts = ToastQueue::new();
        let handle = toasts.clone();
        handle.error("boom");
        assert_eq!(toasts.messages(), vec![(NoticeLevel::Error, "boom".to_string())]);
    }
}
