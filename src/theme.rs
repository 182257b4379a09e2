//! Portfolio theme presets and style resolution.
//!
//! A theme is a fixed bundle of five style values: paper, text and muted
//! colors, a font family and a base font size. Three presets ship with the
//! app and every portfolio names one of them:
//!
//! | Key | Label | Paper | Text | Muted |
//! |---|---|---|---|---|
//! | `default` | Default | `#FFFFFF` | `#0B0B0B` | `#6F6F6F` |
//! | `default-dark` | Default (Dark) | `#121212` | `#F5F5F5` | `#A0A0A0` |
//! | `classic` | Classic | `#FDF7EF` | `#1F1A14` | `#887869` |
//!
//! ## Resolution
//!
//! [`resolve_theme`] starts from the preset defaults and merges a sparse
//! [`ThemeOverrides`] on top, field by field. Only present, non-empty
//! override values win. Colors go through [`normalize_to_hex`], font sizes
//! through [`normalize_font_size`]; a font size that fails to parse is
//! dropped rather than replacing the default.
//!
//! Overrides belong to one preset. Switching preset starts clean from the new
//! preset's defaults, see [`ThemeStyle::switch_preset`].
//!
//! ## Legacy keys
//!
//! Early portfolio files stored `light` / `dark`. [`normalize_preset_key`]
//! maps those to `default` / `default-dark` and anything unknown to
//! `default`, so loading never fails on a preset key.

use serde::{Deserialize, Serialize};
use std::fmt;

const SANS_STACK: &str =
    "Manrope, system-ui, -apple-system, 'Segoe UI', Roboto, 'Helvetica Neue', Arial";
const SERIF_STACK: &str = "'Garamond', 'Times New Roman', Times, serif";

/// Fallback for any color that fails validation.
pub const BLACK: &str = "#000000";

pub const MIN_FONT_SIZE_PX: u32 = 8;
pub const MAX_FONT_SIZE_PX: u32 = 32;

/// One of the three shipped presets.
///
/// Serialized as its kebab-case key. Deserialization goes through
/// [`normalize_preset_key`], so legacy and unknown keys load as a valid preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PresetKey {
    #[default]
    Default,
    DefaultDark,
    Classic,
}

impl PresetKey {
    pub const ALL: [PresetKey; 3] = [
        PresetKey::Default,
        PresetKey::DefaultDark,
        PresetKey::Classic,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PresetKey::Default => "default",
            PresetKey::DefaultDark => "default-dark",
            PresetKey::Classic => "classic",
        }
    }

    /// Human-facing name used in menus and summaries.
    pub fn label(self) -> &'static str {
        match self {
            PresetKey::Default => "Default",
            PresetKey::DefaultDark => "Default (Dark)",
            PresetKey::Classic => "Classic",
        }
    }

    /// The preset's complete default style record.
    pub fn defaults(self) -> ThemeStyle {
        match self {
            PresetKey::Default => ThemeStyle {
                paper: "#FFFFFF".to_string(),
                text: "#0B0B0B".to_string(),
                muted: "#6F6F6F".to_string(),
                font_family: SANS_STACK.to_string(),
                body_font_size: "14px".to_string(),
            },
            PresetKey::DefaultDark => ThemeStyle {
                paper: "#121212".to_string(),
                text: "#F5F5F5".to_string(),
                muted: "#A0A0A0".to_string(),
                font_family: SANS_STACK.to_string(),
                body_font_size: "14px".to_string(),
            },
            PresetKey::Classic => ThemeStyle {
                paper: "#FDF7EF".to_string(),
                text: "#1F1A14".to_string(),
                muted: "#887869".to_string(),
                font_family: SERIF_STACK.to_string(),
                body_font_size: "13px".to_string(),
            },
        }
    }

    fn from_known(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == key)
    }
}

impl fmt::Display for PresetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for PresetKey {
    fn from(raw: String) -> Self {
        normalize_preset_key(&raw)
    }
}

impl From<PresetKey> for String {
    fn from(key: PresetKey) -> Self {
        key.as_str().to_string()
    }
}

const LEGACY_ALIASES: &[(&str, PresetKey)] =
    &[("light", PresetKey::Default), ("dark", PresetKey::DefaultDark)];

/// Map any raw preset key onto a known preset. Never fails.
///
/// Known keys pass through, legacy aliases are translated, everything else
/// (including the empty string) becomes [`PresetKey::Default`].
pub fn normalize_preset_key(raw: &str) -> PresetKey {
    let key = raw.trim();
    if let Some(known) = PresetKey::from_known(key) {
        return known;
    }
    LEGACY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, preset)| *preset)
        .unwrap_or_default()
}

/// Normalize a color to canonical `#RRGGBB` (uppercase).
///
/// Accepts `#RGB`, `#RRGGBB`, `RGB` and `RRGGBB`. Anything else resolves to
/// [`BLACK`]. Idempotent.
pub fn normalize_to_hex(value: &str) -> String {
    let trimmed = value.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);

    let expanded: String = if digits.len() == 3 {
        digits.chars().flat_map(|c| [c, c]).collect()
    } else {
        digits.to_string()
    };

    if expanded.len() == 6 && expanded.chars().all(|c| c.is_ascii_hexdigit()) {
        format!("#{}", expanded.to_ascii_uppercase())
    } else {
        BLACK.to_string()
    }
}

/// Parse a font size like `"15px"` or `"15"` into a clamped `"<n>px"`.
///
/// Returns `None` when no leading integer can be read.
pub fn normalize_font_size(value: &str) -> Option<String> {
    let trimmed = value.trim();
    let number: String = trimmed.chars().take_while(|c| c.is_ascii_digit()).collect();
    let px: u32 = number.parse().ok()?;
    Some(format!("{}px", px.clamp(MIN_FONT_SIZE_PX, MAX_FONT_SIZE_PX)))
}

/// A fully-populated style record. Every field is always set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeStyle {
    pub paper: String,
    pub text: String,
    pub muted: String,
    pub font_family: String,
    pub body_font_size: String,
}

impl Default for ThemeStyle {
    fn default() -> Self {
        PresetKey::Default.defaults()
    }
}

impl ThemeStyle {
    /// Merge customizations on top of this style (same preset).
    pub fn with_overrides(mut self, overrides: &ThemeOverrides) -> Self {
        if let Some(paper) = present(&overrides.paper) {
            self.paper = normalize_to_hex(paper);
        }
        if let Some(text) = present(&overrides.text) {
            self.text = normalize_to_hex(text);
        }
        if let Some(muted) = present(&overrides.muted) {
            self.muted = normalize_to_hex(muted);
        }
        if let Some(family) = present(&overrides.font_family) {
            self.font_family = family.trim().to_string();
        }
        if let Some(size) = present(&overrides.body_font_size).and_then(normalize_font_size) {
            self.body_font_size = size;
        }
        self
    }

    /// Style after switching from `current` to `next`.
    ///
    /// Customizations are scoped to a preset: a real switch yields exactly
    /// the new preset's defaults. Re-selecting the current preset keeps them.
    pub fn switch_preset(&self, current: PresetKey, next: PresetKey) -> ThemeStyle {
        if current == next {
            next.defaults().with_overrides(&ThemeOverrides::from(self.clone()))
        } else {
            next.defaults()
        }
    }

    /// Restore one field to the preset default.
    pub fn reset_field(&mut self, preset: PresetKey, field: ThemeField) {
        let defaults = preset.defaults();
        match field {
            ThemeField::Paper => self.paper = defaults.paper,
            ThemeField::Text => self.text = defaults.text,
            ThemeField::Muted => self.muted = defaults.muted,
            ThemeField::FontFamily => self.font_family = defaults.font_family,
            ThemeField::BodyFontSize => self.body_font_size = defaults.body_font_size,
        }
    }
}

/// Sparse user customizations. Absent or empty fields fall through to the preset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ThemeOverrides {
    pub paper: Option<String>,
    pub text: Option<String>,
    pub muted: Option<String>,
    pub font_family: Option<String>,
    pub body_font_size: Option<String>,
}

impl ThemeOverrides {
    pub fn is_empty(&self) -> bool {
        [
            &self.paper,
            &self.text,
            &self.muted,
            &self.font_family,
            &self.body_font_size,
        ]
        .iter()
        .all(|f| present(f).is_none())
    }
}

impl From<ThemeStyle> for ThemeOverrides {
    fn from(style: ThemeStyle) -> Self {
        Self {
            paper: Some(style.paper),
            text: Some(style.text),
            muted: Some(style.muted),
            font_family: Some(style.font_family),
            body_font_size: Some(style.body_font_size),
        }
    }
}

/// Individually resettable style fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeField {
    Paper,
    Text,
    Muted,
    FontFamily,
    BodyFontSize,
}

/// Resolve a preset plus optional customizations into a complete style.
pub fn resolve_theme(preset: PresetKey, overrides: Option<&ThemeOverrides>) -> ThemeStyle {
    let defaults = preset.defaults();
    match overrides {
        Some(ov) => defaults.with_overrides(ov),
        None => defaults,
    }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|v| !v.trim().is_empty())
}
