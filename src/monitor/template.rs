//! Announcement text rendering.

use crate::config::MonitorConfig;
use crate::monitor::queue_number::spoken_counter;

/// Announcement template with `{window}`, `{counter}`, `{number}` and
/// `{client}` placeholders.
///
/// `{client}` expands to `", <name>"` when a client name is known and client
/// names are enabled, and to nothing otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnouncementTemplate {
    template: String,
    client_names: bool,
}

impl AnnouncementTemplate {
    pub fn new(template: impl Into<String>, client_names: bool) -> Self {
        Self {
            template: template.into(),
            client_names,
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.template.clone(), config.announce_client_name)
    }

    pub fn render(&self, window_label: &str, queue_number: &str, client_name: Option<&str>) -> String {
        let client = match client_name.map(str::trim) {
            Some(name) if self.client_names && !name.is_empty() => format!(", {}", name),
            _ => String::new(),
        };

        let counter = spoken_counter(queue_number);
        let placeholders = [
            ("{window}", window_label.trim()),
            ("{counter}", counter.as_str()),
            ("{number}", queue_number),
            ("{client}", client.as_str()),
        ];

        // Single pass, so substituted values are never expanded again.
        let mut text = String::with_capacity(self.template.len() + 32);
        let mut rest = self.template.as_str();
        while let Some(start) = rest.find('{') {
            text.push_str(&rest[..start]);
            let tail = &rest[start..];
            match placeholders
                .iter()
                .find(|(name, _)| tail.starts_with(name))
            {
                Some((name, value)) => {
                    text.push_str(value);
                    rest = &tail[name.len()..];
                }
                None => {
                    text.push('{');
                    rest = &tail[1..];
                }
            }
        }
        text.push_str(rest);
        text
    }
}

impl Default for AnnouncementTemplate {
    fn default() -> Self {
        Self::from_config(&MonitorConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_template() {
        let text = AnnouncementTemplate::default().render("Window 1", "012526-0007", Some("Juan"));
        assert_eq!(text, "Now serving number 7, Juan, please proceed to Window 1.");
    }

    #[test]
    fn test_blank_client_name_is_omitted() {
        let template = AnnouncementTemplate::default();
        assert_eq!(
            template.render("Window 2", "012526-0010", Some("  ")),
            "Now serving number 10, please proceed to Window 2."
        );
        assert_eq!(
            template.render("Window 2", "012526-0010", None),
            "Now serving number 10, please proceed to Window 2."
        );
    }

    #[test]
    fn test_client_names_disabled() {
        let template = AnnouncementTemplate::new(
            "Number {counter}{client} to {window}",
            false,
        );
        assert_eq!(template.render("Counter A", "5", Some("Juan")), "Number 5 to Counter A");
    }

    #[test]
    fn test_placeholder_text_in_values_is_not_expanded() {
        let template = AnnouncementTemplate::default();
        assert_eq!(
            template.render("Desk {counter}", "012526-0007", Some("{window}")),
            "Now serving number 7, {window}, please proceed to Desk {counter}."
        );
    }

    #[test]
    fn test_unknown_braces_are_kept() {
        let template = AnnouncementTemplate::new("{counter} {unknown} {", false);
        assert_eq!(template.render("W", "3", None), "3 {unknown} {");
    }

    #[test]
    fn test_full_number_placeholder() {
        let template = AnnouncementTemplate::new("Ticket {number} ({counter})", true);
        assert_eq!(template.render("W", "012526-0042", None), "Ticket 012526-0042 (42)");
    }
}
