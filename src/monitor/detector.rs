//! Turns consecutive window snapshots into new "now serving" announcements.

use crate::backend::WindowState;
use crate::monitor::template::AnnouncementTemplate;
use crate::monitor::types::{AnnouncementItem, AnnouncementKey, DedupView};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Diffs snapshots against the previous one.
///
/// The first snapshot only records the baseline: whatever is being served when
/// the monitor starts has already been announced by someone.
pub struct TransitionDetector {
    template: AnnouncementTemplate,
    collision_window: Duration,
    previous: Option<HashMap<String, String>>,
}

impl TransitionDetector {
    pub fn new(template: AnnouncementTemplate, collision_window: Duration) -> Self {
        Self {
            template,
            collision_window,
            previous: None,
        }
    }

    /// Items for every window whose queue number changed to a new defined value,
    /// in snapshot order, minus duplicates of queued or recently completed keys.
    pub fn detect(
        &mut self,
        snapshot: &[WindowState],
        dedup: &DedupView,
        now: Instant,
    ) -> Vec<AnnouncementItem> {
        let current: HashMap<String, String> = snapshot
            .iter()
            .filter_map(|w| {
                w.serving_number()
                    .map(|n| (w.id.as_str().to_string(), n.to_string()))
            })
            .collect();

        let Some(previous) = self.previous.replace(current) else {
            tracing::debug!(windows = snapshot.len(), "baseline snapshot recorded");
            return Vec::new();
        };

        let mut items: Vec<AnnouncementItem> = Vec::new();
        for window in snapshot {
            let Some(number) = window.serving_number() else {
                continue;
            };
            if previous.get(window.id.as_str()).map(String::as_str) == Some(number) {
                continue;
            }

            let key = AnnouncementKey::new(window.id.as_str(), number);
            if dedup.is_duplicate(&key, now, self.collision_window)
                || items.iter().any(|item| item.key == key)
            {
                tracing::debug!(%key, "duplicate transition suppressed");
                continue;
            }

            let client_name = window
                .current_serving
                .as_ref()
                .and_then(|c| c.client_name.as_deref());
            let text = self.template.render(&window.label, number, client_name);
            items.push(AnnouncementItem { text, key });
        }

        items
    }
}
