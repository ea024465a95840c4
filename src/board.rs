//! Terminal rendering of the public "now serving" board.

use crate::backend::{Staff, WindowState};
use crate::monitor::queue_counter;
use owo_colors::OwoColorize;

/// Render every window as a small block, or a placeholder when there are none.
pub fn render_board(windows: &[WindowState], color: bool) -> String {
    if windows.is_empty() {
        return format!("{}\n", paint("No active windows at the moment", color, Paint::Dim));
    }

    let mut out = String::new();
    for window in windows {
        render_window(&mut out, window, color);
        out.push('\n');
    }
    out
}

fn render_window(out: &mut String, window: &WindowState, color: bool) {
    push_line(out, paint(&window.label, color, Paint::Bold));

    if let Some(staff) = &window.staff {
        push_line(
            out,
            format!(
                "  {} {}",
                paint(&format!("[{}]", initials(staff)), color, Paint::Dim),
                staff.name
            ),
        );
    }

    let Some(serving) = &window.current_serving else {
        push_line(out, format!("  {}", paint("No active service", color, Paint::Dim)));
        return;
    };

    let number = window.serving_number().map(queue_counter).unwrap_or("-");
    push_line(
        out,
        format!(
            "  {} {}",
            paint("Now Serving:", color, Paint::Dim),
            paint(number, color, Paint::Highlight)
        ),
    );

    let mut details: Vec<String> = Vec::new();
    if let Some(name) = serving.client_name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        details.push(name.to_string());
    }
    if let Some(client_type) = serving.client_type {
        details.push(client_type.label().to_string());
    }
    if !details.is_empty() {
        push_line(out, format!("  {}", details.join(" · ")));
    }

    if let Some(category) = &serving.category {
        let line = match &serving.sub_category {
            Some(sub) => format!("{} - {}", category.name(), sub.name()),
            None => category.name().to_string(),
        };
        push_line(out, format!("  {}", paint(&line, color, Paint::Dim)));
    }
}

fn push_line(out: &mut String, line: String) {
    out.push_str(&line);
    out.push('\n');
}

/// Initials shown in place of a profile picture.
fn initials(staff: &Staff) -> String {
    let parts: Vec<&str> = staff.name.split_whitespace().collect();
    match parts.as_slice() {
        [] => "?".to_string(),
        [only] => only.chars().take(2).collect::<String>().to_uppercase(),
        [first, .., last] => first
            .chars()
            .take(1)
            .chain(last.chars().take(1))
            .collect::<String>()
            .to_uppercase(),
    }
}

enum Paint {
    Bold,
    Dim,
    Highlight,
}

fn paint(text: &str, color: bool, style: Paint) -> String {
    if !color {
        return text.to_string();
    }
    match style {
        Paint::Bold => text.bold().to_string(),
        Paint::Dim => text.dimmed().to_string(),
        Paint::Highlight => text.blue().bold().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ClientType, Labeled, ServingClient, WindowId};

    fn serving_window() -> WindowState {
        WindowState {
            id: WindowId::new("1"),
            label: "Window 1".to_string(),
            staff: Some(Staff {
                name: "Maria Clara Santos".to_string(),
                profile_picture: None,
            }),
            current_serving: Some(ServingClient {
                queue_number: Some("012526-0007".to_string()),
                client_name: Some("Juan".to_string()),
                client_type: Some(ClientType::SeniorCitizen),
                category: Some(Labeled::Object {
                    name: "Permits".to_string(),
                }),
                sub_category: Some(Labeled::Name("Renewal".to_string())),
            }),
        }
    }

    #[test]
    fn test_empty_board() {
        assert_eq!(render_board(&[], false), "No active windows at the moment\n");
    }

    #[test]
    fn test_serving_window() {
        let board = render_board(&[serving_window()], false);

        assert!(board.contains("Window 1"));
        assert!(board.contains("[MS] Maria Clara Santos"));
        assert!(board.contains("Now Serving: 0007"));
        assert!(board.contains("Juan · Senior"));
        assert!(board.contains("Permits - Renewal"));
    }

    #[test]
    fn test_idle_window() {
        let window = WindowState {
            current_serving: None,
            staff: None,
            ..serving_window()
        };
        let board = render_board(&[window], false);

        assert!(board.contains("No active service"));
        assert!(!board.contains("Now Serving"));
    }

    #[test]
    fn test_color_adds_escape_codes() {
        let plain = render_board(&[serving_window()], false);
        let colored = render_board(&[serving_window()], true);

        assert!(!plain.contains('\x1b'));
        assert!(colored.contains('\x1b'));
    }

    #[test]
    fn test_initials() {
        let staff = |name: &str| Staff {
            name: name.to_string(),
            profile_picture: None,
        };
        assert_eq!(initials(&staff("ana")), "AN");
        assert_eq!(initials(&staff("Ana Reyes")), "AR");
        assert_eq!(initials(&staff("  ")), "?");
    }
}
