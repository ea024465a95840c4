//! Announcement queue data.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Identity of an announcement: `windowId:queueNumber`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnnouncementKey(String);

impl AnnouncementKey {
    pub fn new(window_id: &str, queue_number: &str) -> Self {
        Self(format!("{}:{}", window_id, queue_number))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnnouncementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One announcement waiting to be played.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnouncementItem {
    pub text: String,
    pub key: AnnouncementKey,
}

/// The most recently completed announcement.
#[derive(Debug, Clone, PartialEq)]
pub struct LastAnnounced {
    pub key: AnnouncementKey,
    pub at: Instant,
}

/// What the detector needs to know about the queue to avoid duplicates.
#[derive(Debug, Clone, Default)]
pub struct DedupView {
    /// Keys pending or in flight.
    pub queued: HashSet<AnnouncementKey>,
    pub last: Option<LastAnnounced>,
}

impl DedupView {
    /// True when `key` is queued or was completed less than `window` before `now`.
    pub fn is_duplicate(&self, key: &AnnouncementKey, now: Instant, window: Duration) -> bool {
        if self.queued.contains(key) {
            return true;
        }
        self.last
            .as_ref()
            .is_some_and(|last| &last.key == key && now.saturating_duration_since(last.at) < window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        let key = AnnouncementKey::new("3", "012526-0007");
        assert_eq!(key.as_str(), "3:012526-0007");
        assert_eq!(key.to_string(), "3:012526-0007");
    }

    #[tokio::test(start_paused = true)]
    async fn test_dedup_window() {
        let key = AnnouncementKey::new("1", "A");
        let start = Instant::now();
        let view = DedupView {
            queued: HashSet::new(),
            last: Some(LastAnnounced {
                key: key.clone(),
                at: start,
            }),
        };
        let window = Duration::from_millis(8000);

        assert!(view.is_duplicate(&key, start + Duration::from_millis(5000), window));
        assert!(!view.is_duplicate(&key, start + Duration::from_millis(8000), window));
        assert!(!view.is_duplicate(&AnnouncementKey::new("1", "B"), start, window));
    }

    #[test]
    fn test_queued_key_is_duplicate() {
        let key = AnnouncementKey::new("1", "A");
        let mut view = DedupView::default();
        view.queued.insert(key.clone());

        assert!(view.is_duplicate(&key, Instant::now(), Duration::ZERO));
    }
}
