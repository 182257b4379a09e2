//! Portfolio data types shared by the document, the session and the renderer.
//!
//! These types define the persisted JSON shape:
//!
//! ```json
//! {
//!   "userInfo": { "name": "...", "themePreset": "default", "theme": { ... }, ... },
//!   "pages": [
//!     { "type": "cover", "data": { ...userInfo }, "image": null },
//!     { "type": "single", "data": { "title": "Image 1", "year": "", "desc": "" }, "image": "data:..." },
//!     { "type": "series-cover", "data": { "title": "Show", "year": "", "desc": "", "total": 2 }, "seriesKey": "Show" },
//!     { "type": "series-image", "data": { "title": "Image 1", "year": "", "desc": "" }, "image": null,
//!       "seriesKey": "Show", "seriesTotal": 2 }
//!   ]
//! }
//! ```
//!
//! Files written by older versions used `seriesTitle` for the group tag; it is
//! accepted as an alias of `seriesKey`.

use crate::imaging::ImageData;
use crate::theme::{PresetKey, ThemeOverrides, ThemeStyle, resolve_theme};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORTFOLIO_LABEL: &str = "Portfolio";

/// The artist's identity, shown on the cover page.
///
/// `theme` is always complete: on load, whatever was stored is merged over
/// the preset defaults, so a partial or missing theme cannot be observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredIdentity")]
pub struct UserIdentity {
    pub name: String,
    /// Active years, e.g. "2014 – present".
    pub years: String,
    pub statement: String,
    /// Social profile URL.
    pub instagram: String,
    /// Social handle shown next to the profile link.
    pub username: String,
    pub email: String,
    pub portfolio_label: String,
    pub theme_preset: PresetKey,
    pub theme: ThemeStyle,
}

impl Default for UserIdentity {
    fn default() -> Self {
        Self {
            name: String::new(),
            years: String::new(),
            statement: String::new(),
            instagram: String::new(),
            username: String::new(),
            email: String::new(),
            portfolio_label: DEFAULT_PORTFOLIO_LABEL.to_string(),
            theme_preset: PresetKey::Default,
            theme: PresetKey::Default.defaults(),
        }
    }
}

/// On-disk identity shape: every field optional, theme sparse.
#[derive(Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct StoredIdentity {
    name: String,
    years: String,
    statement: String,
    instagram: String,
    username: String,
    email: String,
    portfolio_label: Option<String>,
    theme_preset: PresetKey,
    theme: Option<ThemeOverrides>,
}

impl Default for StoredIdentity {
    fn default() -> Self {
        Self {
            name: String::new(),
            years: String::new(),
            statement: String::new(),
            instagram: String::new(),
            username: String::new(),
            email: String::new(),
            portfolio_label: None,
            theme_preset: PresetKey::Default,
            theme: None,
        }
    }
}

impl From<StoredIdentity> for UserIdentity {
    fn from(raw: StoredIdentity) -> Self {
        Self {
            name: raw.name,
            years: raw.years,
            statement: raw.statement,
            instagram: raw.instagram,
            username: raw.username,
            email: raw.email,
            portfolio_label: raw
                .portfolio_label
                .unwrap_or_else(|| DEFAULT_PORTFOLIO_LABEL.to_string()),
            theme_preset: raw.theme_preset,
            theme: resolve_theme(raw.theme_preset, raw.theme.as_ref()),
        }
    }
}

/// Values collected by the identity form.
///
/// Applying a form keeps the current portfolio label. The theme follows the
/// preset scoping rule: a different preset starts from its defaults, the
/// same preset keeps the current customizations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityForm {
    pub name: String,
    pub years: String,
    pub statement: String,
    pub instagram: String,
    pub username: String,
    pub email: String,
    /// Raw preset selection; `None` keeps the current preset.
    pub preset: Option<String>,
}

impl IdentityForm {
    pub fn apply_to(self, current: &UserIdentity) -> UserIdentity {
        let portfolio_label = if current.portfolio_label.is_empty() {
            DEFAULT_PORTFOLIO_LABEL.to_string()
        } else {
            current.portfolio_label.clone()
        };
        let preset = self
            .preset
            .as_deref()
            .map(crate::theme::normalize_preset_key)
            .unwrap_or(current.theme_preset);
        UserIdentity {
            name: self.name,
            years: self.years,
            statement: self.statement,
            instagram: self.instagram,
            username: self.username,
            email: self.email,
            portfolio_label,
            theme_preset: preset,
            theme: current.theme.switch_preset(current.theme_preset, preset),
        }
    }
}

/// Stable, in-memory page identity. Not persisted; reassigned on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId(pub(crate) u64);

/// Title, year and description of a single image page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageText {
    pub title: String,
    pub year: String,
    pub desc: String,
}

/// Text of a series cover page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeriesText {
    pub title: String,
    pub year: String,
    pub desc: String,
    /// Declared image count.
    pub total: usize,
}

/// One page of the portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Page {
    /// Snapshot of the identity at last sync.
    Cover {
        data: UserIdentity,
    },
    Single {
        data: ImageText,
        #[serde(default)]
        image: Option<ImageData>,
    },
    #[serde(rename_all = "camelCase")]
    SeriesCover {
        data: SeriesText,
        #[serde(alias = "seriesTitle")]
        series_key: String,
    },
    #[serde(rename_all = "camelCase")]
    SeriesImage {
        data: ImageText,
        #[serde(default)]
        image: Option<ImageData>,
        #[serde(alias = "seriesTitle")]
        series_key: String,
        #[serde(default)]
        series_total: usize,
    },
}

/// Discriminant of [`Page`], for display and filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Cover,
    Single,
    SeriesCover,
    SeriesImage,
}

impl PageKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PageKind::Cover => "cover",
            PageKind::Single => "single",
            PageKind::SeriesCover => "series-cover",
            PageKind::SeriesImage => "series-image",
        }
    }
}

impl Page {
    pub fn kind(&self) -> PageKind {
        match self {
            Page::Cover { .. } => PageKind::Cover,
            Page::Single { .. } => PageKind::Single,
            Page::SeriesCover { .. } => PageKind::SeriesCover,
            Page::SeriesImage { .. } => PageKind::SeriesImage,
        }
    }

    pub fn image(&self) -> Option<&ImageData> {
        match self {
            Page::Single { image, .. } | Page::SeriesImage { image, .. } => image.as_ref(),
            Page::Cover { .. } | Page::SeriesCover { .. } => None,
        }
    }

    /// Whether the page has an image slot at all.
    pub fn accepts_image(&self) -> bool {
        matches!(self, Page::Single { .. } | Page::SeriesImage { .. })
    }

    pub fn series_key(&self) -> Option<&str> {
        match self {
            Page::SeriesCover { series_key, .. } | Page::SeriesImage { series_key, .. } => {
                Some(series_key)
            }
            Page::Cover { .. } | Page::Single { .. } => None,
        }
    }

    /// Short label for page lists: the title, the artist name for the cover,
    /// or the kind when both are empty.
    pub fn display_title(&self) -> &str {
        let title = match self {
            Page::Cover { data } => data.name.as_str(),
            Page::Single { data, .. } | Page::SeriesImage { data, .. } => data.title.as_str(),
            Page::SeriesCover { data, .. } => data.title.as_str(),
        };
        if title.is_empty() {
            self.kind().as_str()
        } else {
            title
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_defaults() {
        let id = UserIdentity::default();
        assert_eq!(id.portfolio_label, "Portfolio");
        assert_eq!(id.theme_preset, PresetKey::Default);
        assert_eq!(id.theme, PresetKey::Default.defaults());
    }

    #[test]
    fn identity_loads_with_partial_theme() {
        let json = r##"{
            "name": "A. Artist",
            "themePreset": "classic",
            "theme": { "paper": "#fff" }
        }"##;
        let id: UserIdentity = serde_json::from_str(json).unwrap();
        assert_eq!(id.name, "A. Artist");
        assert_eq!(id.theme_preset, PresetKey::Classic);
        assert_eq!(id.theme.paper, "#FFFFFF");
        assert_eq!(id.theme.font_family, PresetKey::Classic.defaults().font_family);
        assert_eq!(id.portfolio_label, "Portfolio");
    }

    #[test]
    fn identity_loads_legacy_preset_key() {
        let id: UserIdentity = serde_json::from_str(r#"{"themePreset": "dark"}"#).unwrap();
        assert_eq!(id.theme_preset, PresetKey::DefaultDark);
        assert_eq!(id.theme, PresetKey::DefaultDark.defaults());
    }

    #[test]
    fn identity_loads_from_empty_object() {
        let id: UserIdentity = serde_json::from_str("{}").unwrap();
        assert_eq!(id, UserIdentity::default());
    }

    #[test]
    fn identity_serializes_camel_case() {
        let json = serde_json::to_value(UserIdentity::default()).unwrap();
        assert_eq!(json["portfolioLabel"], "Portfolio");
        assert_eq!(json["themePreset"], "default");
        assert!(json["theme"]["bodyFontSize"].is_string());
    }

    #[test]
    fn form_keeps_label_and_customizations_for_same_preset() {
        let mut current = UserIdentity {
            portfolio_label: "Works".to_string(),
            ..Default::default()
        };
        current.theme.paper = "#ABCDEF".to_string();

        let next = IdentityForm {
            name: "B".to_string(),
            preset: Some("default".to_string()),
            ..Default::default()
        }
        .apply_to(&current);

        assert_eq!(next.name, "B");
        assert_eq!(next.portfolio_label, "Works");
        assert_eq!(next.theme.paper, "#ABCDEF");
    }

    #[test]
    fn form_with_new_preset_resets_theme() {
        let mut current = UserIdentity::default();
        current.theme.paper = "#ABCDEF".to_string();

        let next = IdentityForm {
            preset: Some("light-or-whatever".to_string()),
            ..Default::default()
        }
        .apply_to(&current);
        // Unknown key normalizes to default, which is already active
        assert_eq!(next.theme.paper, "#ABCDEF");

        let next = IdentityForm {
            preset: Some("classic".to_string()),
            ..Default::default()
        }
        .apply_to(&current);
        assert_eq!(next.theme_preset, PresetKey::Classic);
        assert_eq!(next.theme, PresetKey::Classic.defaults());
    }

    #[test]
    fn page_tagged_by_type() {
        let page = Page::Single {
            data: ImageText {
                title: "Image 1".to_string(),
                ..Default::default()
            },
            image: None,
        };
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["type"], "single");
        assert_eq!(json["data"]["title"], "Image 1");
    }

    #[test]
    fn series_image_accepts_legacy_series_title() {
        let json = r#"{
            "type": "series-image",
            "data": { "title": "Image 1", "desc": "" },
            "image": null,
            "seriesTitle": "Show",
            "seriesTotal": 2
        }"#;
        let page: Page = serde_json::from_str(json).unwrap();
        assert_eq!(page.series_key(), Some("Show"));
        assert!(matches!(page, Page::SeriesImage { series_total: 2, .. }));
    }

    #[test]
    fn series_cover_without_image_field() {
        let json = r#"{
            "type": "series-cover",
            "data": { "title": "Show", "year": "2020", "desc": "", "total": 3 },
            "image": null,
            "seriesTitle": "Show"
        }"#;
        let page: Page = serde_json::from_str(json).unwrap();
        assert_eq!(page.kind(), PageKind::SeriesCover);
        assert!(!page.accepts_image());
    }

    #[test]
    fn display_title_falls_back_to_kind() {
        let cover = Page::Cover {
            data: UserIdentity::default(),
        };
        assert_eq!(cover.display_title(), "cover");
    }
}
