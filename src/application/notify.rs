//! User-visible notices.
//!
//! Failure reports fan out over a broadcast hub; whatever front-end is
//! attached (the CLI here, toasts elsewhere) subscribes and renders them.
//! Sending with no subscriber is fine and simply drops the notice.

use tokio::sync::broadcast;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Warning,
    Error,
}

impl NoticeLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            NoticeLevel::Warning => "warning",
            NoticeLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub level: NoticeLevel,
    /// What the user was doing, e.g. "toggle status".
    pub context: String,
    /// Server-provided detail when available.
    pub detail: String,
}

#[derive(Clone)]
pub struct NoticeHub {
    tx: broadcast::Sender<Notice>,
}

impl Default for NoticeHub {
    fn default() -> Self {
        Self::new()
    }
}

impl NoticeHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    pub fn error(&self, context: impl Into<String>, detail: impl Into<String>) {
        self.send(NoticeLevel::Error, context.into(), detail.into());
    }

    pub fn warning(&self, context: impl Into<String>, detail: impl Into<String>) {
        self.send(NoticeLevel::Warning, context.into(), detail.into());
    }

    fn send(&self, level: NoticeLevel, context: String, detail: String) {
        warn!(level = level.as_str(), context, detail, "user-visible notice");
        let _ = self.tx.send(Notice {
            level,
            context,
            detail,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_notices() {
        let hub = NoticeHub::new();
        let mut rx = hub.subscribe();

        hub.error("toggle status", "status 500 boom");

        let notice = rx.recv().await.expect("notice");
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.context, "toggle status");
        assert!(notice.detail.contains("boom"));
    }

    #[test]
    fn send_without_subscribers_does_not_panic() {
        let hub = NoticeHub::new();
        hub.warning("cover upload", "continuing without new cover");
    }
}
