#![warn(missing_docs)]
//! # indassist-notify
//!
//! Bounded queue of short-lived user-facing notifications.
//!
//! Every pushed message receives an opaque [`NotificationId`]; expiry and
//! dismissal are keyed by that id, so two notifications with identical text
//! never cancel each other. Time is supplied by the caller in milliseconds,
//! which keeps eviction deterministic under test.

/// Maximum number of notifications visible at once.
pub const MAX_VISIBLE: usize = 5;

/// Lifetime of one notification.
pub const NOTIFICATION_TTL_MS: u64 = 5_000;

/// Opaque identity of one pushed notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationId(u64);

/// One visible notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Identity assigned at push time.
    pub id: NotificationId,
    /// Display text.
    pub message: String,
    /// Push time in caller milliseconds.
    pub created_at_ms: u64,
}

impl Notification {
    /// Returns the time at which this notification expires.
    pub fn expires_at_ms(&self, ttl_ms: u64) -> u64 {
        self.created_at_ms.saturating_add(ttl_ms)
    }
}

/// Newest-first bounded notification queue.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    entries: Vec<Notification>,
    capacity: usize,
    ttl_ms: u64,
    next_id: u64,
}

impl NotificationQueue {
    /// Creates a queue with [`MAX_VISIBLE`] capacity and [`NOTIFICATION_TTL_MS`] lifetime.
    pub fn new() -> Self {
        Self::with_limits(MAX_VISIBLE, NOTIFICATION_TTL_MS)
    }

    /// Creates a queue with explicit limits. A zero capacity is raised to one.
    pub fn with_limits(capacity: usize, ttl_ms: u64) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Vec::with_capacity(capacity + 1),
            capacity,
            ttl_ms,
            next_id: 0,
        }
    }

    /// Prepends a message and drops the oldest entries beyond capacity.
    pub fn push(&mut self, message: impl Into<String>, now_ms: u64) -> NotificationId {
        self.next_id += 1;
        let id = NotificationId(self.next_id);
        self.entries.insert(
            0,
            Notification {
                id,
                message: message.into(),
                created_at_ms: now_ms,
            },
        );
        self.entries.truncate(self.capacity);
        id
    }

    /// Removes every notification whose own lifetime has elapsed.
    ///
    /// # Returns
    /// Ids of the removed notifications, newest first.
    pub fn expire(&mut self, now_ms: u64) -> Vec<NotificationId> {
        let ttl_ms = self.ttl_ms;
        let mut expired = Vec::new();
        self.entries.retain(|entry| {
            let alive = now_ms < entry.expires_at_ms(ttl_ms);
            if !alive {
                expired.push(entry.id);
            }
            alive
        });
        expired
    }

    /// Removes one notification early. Returns `false` if it was already gone.
    pub fn dismiss(&mut self, id: NotificationId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    /// Visible notifications, newest first.
    pub fn visible(&self) -> &[Notification] {
        &self.entries
    }

    /// Visible messages, newest first.
    pub fn messages(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|entry| entry.message.as_str())
            .collect()
    }

    /// Number of visible notifications.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when nothing is visible.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for NotificationQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_five_most_recent() {
        let mut queue = NotificationQueue::new();
        for index in 0..8 {
            queue.push(format!("message {index}"), index);
        }

        assert_eq!(queue.len(), MAX_VISIBLE);
        assert_eq!(queue.messages()[0], "message 7");
        assert_eq!(queue.messages()[4], "message 3");
    }

    #[test]
    fn identical_messages_expire_independently() {
        let mut queue = NotificationQueue::new();
        let first = queue.push("Camera not ready", 0);
        let second = queue.push("Camera not ready", 3_000);

        assert_eq!(queue.expire(5_000), vec![first]);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.visible()[0].id, second);

        assert_eq!(queue.expire(8_000), vec![second]);
        assert!(queue.is_empty());
    }

    #[test]
    fn dismiss_removes_only_target() {
        let mut queue = NotificationQueue::new();
        let keep = queue.push("Analysis starting...", 0);
        let drop = queue.push("Analysis starting...", 1);

        assert!(queue.dismiss(drop));
        assert!(!queue.dismiss(drop));
        assert_eq!(queue.visible()[0].id, keep);
    }
}
