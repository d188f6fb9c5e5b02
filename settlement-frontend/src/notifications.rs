//! User-facing notices with duplicate suppression.
//!
//! The same message of the same kind is shown once per dedup window; repeats
//! inside the window are dropped.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Info,
}

impl NotificationKind {
    /// How long a front end should keep the notice on screen.
    pub fn display_duration(self) -> Duration {
        match self {
            NotificationKind::Success => Duration::from_secs(4),
            NotificationKind::Error => Duration::from_secs(5),
            NotificationKind::Warning => Duration::from_secs(4),
            NotificationKind::Info => Duration::from_secs(3),
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NotificationKind::Success => "success",
            NotificationKind::Error => "error",
            NotificationKind::Warning => "warning",
            NotificationKind::Info => "info",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
}

#[derive(Debug)]
pub struct Notifier {
    window: Duration,
    last_shown: HashMap<(NotificationKind, String), Instant>,
    pending: Vec<Notification>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(DEFAULT_DEDUP_WINDOW)
    }
}

impl Notifier {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_shown: HashMap::new(),
            pending: Vec::new(),
        }
    }

    /// Queue a notice. Returns `false` when it was suppressed as a duplicate.
    pub fn notify(&mut self, kind: NotificationKind, message: impl Into<String>) -> bool {
        let message = message.into();
        let now = Instant::now();
        let window = self.window;

        self.last_shown
            .retain(|_, shown_at| now.duration_since(*shown_at) < window);

        let key = (kind, message);
        if self.last_shown.contains_key(&key) {
            tracing::debug!(kind = %kind, message = %key.1, "Duplicate notification suppressed");
            return false;
        }

        match kind {
            NotificationKind::Error => tracing::error!(kind = %kind, message = %key.1, "Notification"),
            NotificationKind::Warning => tracing::warn!(kind = %kind, message = %key.1, "Notification"),
            _ => tracing::info!(kind = %kind, message = %key.1, "Notification"),
        }

        self.pending.push(Notification {
            kind,
            message: key.1.clone(),
        });
        self.last_shown.insert(key, now);
        true
    }

    pub fn success(&mut self, message: impl Into<String>) -> bool {
        self.notify(NotificationKind::Success, message)
    }

    pub fn error(&mut self, message: impl Into<String>) -> bool {
        self.notify(NotificationKind::Error, message)
    }

    pub fn warning(&mut self, message: impl Into<String>) -> bool {
        self.notify(NotificationKind::Warning, message)
    }

    pub fn info(&mut self, message: impl Into<String>) -> bool {
        self.notify(NotificationKind::Info, message)
    }

    /// Take every notice queued since the last drain.
    pub fn drain(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.pending)
    }

    pub fn pending(&self) -> &[Notification] {
        &self.pending
    }
}
