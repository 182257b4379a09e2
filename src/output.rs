//! CLI output formatting.
//!
//! # Information-First Display
//!
//! Every page is shown by its position and title first, with kind-specific
//! details as indented context lines. The listing reads as the portfolio's
//! table of contents.
//!
//! # Output Format
//!
//! ## Pages
//!
//! ```text
//! A. Artist · Portfolio (5 pages, theme: Classic)
//! 001 A. Artist [cover]
//!     Years: 2010 – present
//! 002 Dusk [single]
//!     Year: 2018
//!     Image: image/jpeg
//! 003 Show [series-cover] (2 images)
//! 004 Image 1 [series-image] (1 of 2)
//!     Image: none
//! ```
//!
//! Series layout problems follow under a `Warnings` heading.
//!
//! # Architecture
//!
//! Each listing has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::config::AppConfig;
use crate::document::Document;
use crate::session::SessionEvent;
use crate::theme::PresetKey;
use crate::types::{Page, UserIdentity};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

fn push_field(lines: &mut Vec<String>, label: &str, value: &str) {
    if !value.is_empty() {
        lines.push(format!("{}{}: {}", indent(1), label, value));
    }
}

// ============================================================================
// Pages
// ============================================================================

fn page_header(position: usize, page: &Page, ordinal: Option<usize>) -> String {
    let base = format!(
        "{} {} [{}]",
        format_index(position),
        page.display_title(),
        page.kind().as_str()
    );
    match (page, ordinal) {
        (Page::SeriesCover { data, .. }, _) => format!("{base} ({} images)", data.total),
        (Page::SeriesImage { series_total, .. }, Some(n)) => {
            format!("{base} ({n} of {series_total})")
        }
        _ => base,
    }
}

fn image_status(page: &Page) -> String {
    match page.image() {
        Some(image) => image.mime().unwrap_or("unknown").to_string(),
        None => "none".to_string(),
    }
}

/// Format the page listing of a document.
pub fn format_document(document: &Document) -> Vec<String> {
    let identity = document.identity();
    let mut lines = vec![format!(
        "{} ({} pages, theme: {})",
        portfolio_title(identity),
        document.len(),
        identity.theme_preset.label()
    )];

    let ordinals = document.series_ordinals();
    for (i, (page, ordinal)) in document.pages().zip(ordinals).enumerate() {
        lines.push(page_header(i + 1, page, ordinal));
        match page {
            Page::Cover { data } => {
                push_field(&mut lines, "Years", &data.years);
            }
            Page::Single { data, .. } | Page::SeriesImage { data, .. } => {
                push_field(&mut lines, "Year", &data.year);
                push_field(&mut lines, "Description", &truncate_desc(&data.desc, 60));
                lines.push(format!("{}Image: {}", indent(1), image_status(page)));
            }
            Page::SeriesCover { data, series_key } => {
                push_field(&mut lines, "Year", &data.year);
                push_field(&mut lines, "Description", &truncate_desc(&data.desc, 60));
                if series_key != &data.title {
                    push_field(&mut lines, "Series", series_key);
                }
            }
        }
    }

    let issues = document.series_layout_issues();
    if !issues.is_empty() {
        lines.push(String::new());
        lines.push("Warnings".to_string());
        for issue in issues {
            lines.push(format!("{}{}", indent(1), issue));
        }
    }
    lines
}

/// Print the page listing to stdout.
pub fn print_document(document: &Document) {
    for line in format_document(document) {
        println!("{}", line);
    }
}

fn portfolio_title(identity: &UserIdentity) -> String {
    if identity.name.is_empty() {
        identity.portfolio_label.clone()
    } else {
        format!("{} · {}", identity.name, identity.portfolio_label)
    }
}

// ============================================================================
// Identity and theme
// ============================================================================

/// Format the identity record, theme included.
pub fn format_identity(identity: &UserIdentity) -> Vec<String> {
    let mut lines = vec![portfolio_title(identity)];
    push_field(&mut lines, "Years", &identity.years);
    push_field(&mut lines, "Statement", &truncate_desc(&identity.statement, 60));
    push_field(&mut lines, "Instagram", &identity.instagram);
    push_field(&mut lines, "Username", &identity.username);
    push_field(&mut lines, "Email", &identity.email);
    lines.extend(format_theme(identity));
    lines
}

pub fn print_identity(identity: &UserIdentity) {
    for line in format_identity(identity) {
        println!("{}", line);
    }
}

/// Format the active theme and the available presets.
///
/// ```text
/// Theme: Classic (classic)
///     paper: #FDF7EF
///     ...
/// Presets: default, default-dark, classic
/// ```
pub fn format_theme(identity: &UserIdentity) -> Vec<String> {
    let preset = identity.theme_preset;
    let theme = &identity.theme;
    let defaults = preset.defaults();
    let field = |name: &str, value: &str, default: &str| {
        let marker = if value == default { "" } else { " (custom)" };
        format!("{}{}: {}{}", indent(1), name, value, marker)
    };
    let presets: Vec<&str> = PresetKey::ALL.iter().map(|p| p.as_str()).collect();
    vec![
        format!("Theme: {} ({})", preset.label(), preset.as_str()),
        field("paper", &theme.paper, &defaults.paper),
        field("text", &theme.text, &defaults.text),
        field("muted", &theme.muted, &defaults.muted),
        field("font-family", &theme.font_family, &defaults.font_family),
        field("font-size", &theme.body_font_size, &defaults.body_font_size),
        format!("Presets: {}", presets.join(", ")),
    ]
}

pub fn print_theme(identity: &UserIdentity) {
    for line in format_theme(identity) {
        println!("{}", line);
    }
}

// ============================================================================
// Misc
// ============================================================================

/// One line per session event. Dirty-state changes are not shown.
pub fn format_event(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::DirtyChanged(_) => None,
        SessionEvent::Saved(path) => Some(format!("Saved {}", path.display())),
        SessionEvent::Notice(message) => Some(message.clone()),
    }
}

pub fn format_year(path: &Path, year: Option<&str>) -> String {
    match year {
        Some(year) => format!("{}: {}", path.display(), year),
        None => format!("{}: no capture year", path.display()),
    }
}

pub fn format_preferences(config: &AppConfig) -> Vec<String> {
    let on_off = |b: bool| if b { "on" } else { "off" };
    vec![
        "Preferences".to_string(),
        format!("{}ui_dark: {}", indent(1), on_off(config.preferences.ui_dark)),
        format!("{}autosave: {}", indent(1), on_off(config.preferences.autosave)),
        format!("{}autosave delay: {}ms", indent(1), config.autosave.delay_ms),
        format!("{}page size: {:?}", indent(1), config.export.page_size),
        format!(
            "{}print command: {}",
            indent(1),
            config.export.print_command.as_deref().unwrap_or("(not set)")
        ),
    ]
}

pub fn print_preferences(config: &AppConfig) {
    for line in format_preferences(config) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::ImageData;
    use std::path::PathBuf;

    fn sample() -> Document {
        let mut doc = Document::new();
        doc.set_identity(UserIdentity {
            name: "A. Artist".to_string(),
            years: "2010".to_string(),
            ..Default::default()
        });
        doc.append_single_page(
            Some(ImageData::from_uri("data:image/jpeg;base64,AAAA")),
            Some("Dusk".to_string()),
            Some("2018".to_string()),
            None,
        );
        doc.append_series("Show", "", "", 2);
        doc
    }

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1234), "1234");
    }

    #[test]
    fn truncate_desc_respects_char_boundaries() {
        assert_eq!(truncate_desc("short", 10), "short");
        assert_eq!(truncate_desc("ééééé", 2), "éé...");
    }

    // =========================================================================
    // Pages
    // =========================================================================

    #[test]
    fn document_listing() {
        let lines = format_document(&sample());
        assert_eq!(
            lines,
            vec![
                "A. Artist · Portfolio (5 pages, theme: Default)",
                "001 A. Artist [cover]",
                "    Years: 2010",
                "002 Dusk [single]",
                "    Year: 2018",
                "    Image: image/jpeg",
                "003 Show [series-cover] (2 images)",
                "004 Image 1 [series-image] (1 of 2)",
                "    Image: none",
                "005 Image 2 [series-image] (2 of 2)",
                "    Image: none",
            ]
        );
    }

    #[test]
    fn document_listing_reports_layout_warnings() {
        let mut doc = sample();
        doc.delete_page(2).unwrap();
        let lines = format_document(&doc);
        assert_eq!(lines[lines.len() - 2], "Warnings");
        assert!(lines.last().unwrap().contains("has no cover"));
    }

    #[test]
    fn renamed_series_cover_shows_key() {
        let mut doc = sample();
        doc.edit_field(2, crate::document::PageField::Title, "Renamed")
            .unwrap();
        let lines = format_document(&doc);
        assert!(lines.contains(&"    Series: Show".to_string()));
    }

    // =========================================================================
    // Theme
    // =========================================================================

    #[test]
    fn theme_marks_customized_fields() {
        let mut identity = UserIdentity::default();
        identity.theme.paper = "#000001".to_string();
        let lines = format_theme(&identity);
        assert_eq!(lines[0], "Theme: Default (default)");
        assert_eq!(lines[1], "    paper: #000001 (custom)");
        assert!(!lines[2].contains("(custom)"));
        assert_eq!(lines[6], "Presets: default, default-dark, classic");
    }

    // =========================================================================
    // Misc
    // =========================================================================

    #[test]
    fn events_hide_dirty_changes() {
        assert_eq!(format_event(&SessionEvent::DirtyChanged(true)), None);
        assert_eq!(
            format_event(&SessionEvent::Saved(PathBuf::from("/tmp/P.json"))),
            Some("Saved /tmp/P.json".to_string())
        );
    }

    #[test]
    fn year_lines() {
        assert_eq!(
            format_year(Path::new("a.jpg"), Some("2019")),
            "a.jpg: 2019"
        );
        assert_eq!(format_year(Path::new("a.jpg"), None), "a.jpg: no capture year");
    }

    #[test]
    fn preferences_lines() {
        let lines = format_preferences(&AppConfig::default());
        assert_eq!(lines[2], "    autosave: off");
        assert_eq!(lines[5], "    print command: (not set)");
    }
}
