use std::time::{Duration, Instant};

/// How long a status message stays visible.
pub const STATUS_TTL: Duration = Duration::from_secs(5);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusSeverity {
    Info,
    Success,
    Error,
}

/// One transient, human-readable status message.
#[derive(Clone, Debug)]
pub struct StatusMessage {
    pub severity: StatusSeverity,
    pub text: String,
    posted_at: Instant,
}

impl StatusMessage {
    pub fn age(&self) -> Duration {
        self.posted_at.elapsed()
    }
}

/// Feed of auto-expiring status messages, one per state change or failure.
#[derive(Clone, Debug)]
pub struct StatusFeed {
    ttl: Duration,
    messages: Vec<StatusMessage>,
}

impl Default for StatusFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusFeed {
    pub fn new() -> Self {
        Self::with_ttl(STATUS_TTL)
    }

    /// Feed with a custom expiry, mainly for tests.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            messages: Vec::new(),
        }
    }

    pub fn post(&mut self, severity: StatusSeverity, text: impl Into<String>) {
        let text = text.into();
        match severity {
            StatusSeverity::Error => tracing::error!(status = %text),
            StatusSeverity::Success | StatusSeverity::Info => tracing::info!(status = %text),
        }
        self.prune();
        self.messages.push(StatusMessage {
            severity,
            text,
            posted_at: Instant::now(),
        });
    }

    /// Messages still within their TTL, oldest first.
    pub fn active(&mut self) -> &[StatusMessage] {
        self.prune();
        &self.messages
    }

    /// The most recent message, expired or not having been pruned yet.
    pub fn latest(&self) -> Option<&StatusMessage> {
        self.messages.last()
    }

    fn prune(&mut self) {
        let ttl = self.ttl;
        self.messages.retain(|m| m.age() < ttl);
    }
}
