//! # Folio
//!
//! A portfolio builder for visual artists. A portfolio is an ordered list of
//! printable pages (a cover, single images and image series) plus the
//! artist's identity and a theme, kept in one self-contained JSON file and
//! printed to PDF through an HTML rendering.
//!
//! # Architecture
//!
//! ```text
//! edit ops ──▶ Document ──▶ payload JSON ──▶ PersistenceBridge (disk)
//!                 │
//!                 └──▶ render (HTML) ──▶ print command ──▶ PDF
//! image files ──▶ ImagePipeline (rayon) ──▶ data URI + year ──▶ Document
//! ```
//!
//! The [`session::Session`] owns one [`document::Document`] and wires the
//! rest around it: the dirty flag, autosave, the image pipeline, prompts
//! before discarding unsaved work, and the event stream the UI listens to.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`types`] | Page variants, identity record, stable page ids |
//! | [`theme`] | Presets, color/size normalization, per-field overrides |
//! | [`document`] | The page list and every edit operation; payload load/save |
//! | [`imaging`] | Data URIs, EXIF capture year, background ingestion |
//! | [`persistence`] | Bridge trait to the host (files, dialogs, PDF export) |
//! | [`autosave`] | Debounce timer for saving after edits |
//! | [`session`] | Editor state: dirty tracking, events, menu and exit flows |
//! | [`render`] | Printable HTML of a document using Maud |
//! | [`config`] | `folio.toml` loading, validation and stock defaults |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## The Cover Follows the Identity
//!
//! The cover page has no data of its own. Setting the identity overwrites
//! the first cover in place, or inserts one at the top when there is none,
//! so the cover and the identity form can never disagree.
//!
//! ## Series Are Grouped By Key, Not By Position
//!
//! Series images carry the key of their cover. Ordinals ("Image 2 of 5")
//! are computed from the current page order rather than stored, so reordering
//! never leaves stale numbers behind. Reordering is permissive: a swap that
//! splits a series is allowed and reported as a layout warning.
//!
//! ## Last Image Wins
//!
//! Image ingestion runs off the editing thread. Every request for a page gets
//! a generation number, and a result is only applied when it is still the
//! newest for its page, whatever order the workers finish in.

pub mod autosave;
pub mod config;
pub mod document;
pub mod imaging;
pub mod output;
pub mod persistence;
pub mod render;
pub mod session;
pub mod theme;
pub mod types;
