//! The in-memory portfolio: an ordered page sequence paired with the
//! artist's identity.
//!
//! Page order is the on-screen order and the export order. Every page gets a
//! [`PageId`] when it enters the document; ids are never reused within a
//! document, so work started against a page (image decoding, metadata
//! extraction) can find it again after reorders and detect that it was
//! deleted.
//!
//! ## Cover page
//!
//! The cover is derived from the identity, never edited on its own:
//! [`Document::set_identity`] re-synthesizes it, inserting it at index 0 the
//! first time and overwriting it in place afterwards. Loading a payload
//! re-syncs the first cover with the loaded identity and drops extra covers;
//! a file with an entered identity but no cover gets one at index 0.
//!
//! ## Series
//!
//! A series is a `series-cover` followed by its `series-image` pages, all
//! sharing a `seriesKey`. An image's ordinal ("Image 2 of 5") is derived from
//! document order in one pass by [`Document::series_ordinals`].
//!
//! Reordering and deletion do not enforce series layout. After such edits
//! [`Document::series_layout_issues`] reports orphaned or split series so the
//! caller can warn; [`Document::delete_series`] removes a whole series.

use crate::imaging::ImageData;
use crate::types::{ImageText, Page, PageId, SeriesText, UserIdentity};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("page index {index} out of range (document has {len} pages)")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("cannot swap page {0} with itself")]
    SameIndex(usize),
    #[error("a {kind} page has no {field} field")]
    FieldNotApplicable { kind: &'static str, field: PageField },
    #[error("a {0} page has no image slot")]
    NoImageSlot(&'static str),
    #[error("page {0} is not a series cover")]
    NotSeriesCover(usize),
}

#[derive(Error, Debug)]
pub enum PayloadError {
    #[error("invalid portfolio JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
struct Entry {
    id: PageId,
    page: Page,
}

/// Persisted document shape.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Payload {
    #[serde(default)]
    user_info: UserIdentity,
    #[serde(default)]
    pages: Vec<Page>,
}

/// Borrowed twin of [`Payload`] so saving does not clone image data.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PayloadRef<'a> {
    user_info: &'a UserIdentity,
    pages: Vec<&'a Page>,
}

#[derive(Debug, Clone, Default)]
pub struct Document {
    identity: UserIdentity,
    entries: Vec<Entry>,
    next_id: u64,
}

/// Documents are equal when identity and pages are; ids are not compared.
impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity && self.pages().eq(other.pages())
    }
}

impl Document {
    /// Empty pre-init document: default identity, no pages, no cover.
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Payload
    // =========================================================================

    /// Parse a persisted payload into a fresh document.
    pub fn from_payload(json: &str) -> Result<Self, PayloadError> {
        let payload: Payload = serde_json::from_str(json)?;
        let mut doc = Self::new();
        doc.identity = payload.user_info;

        let mut seen_cover = false;
        for page in payload.pages {
            if let Page::Cover { .. } = page {
                if seen_cover {
                    continue;
                }
                seen_cover = true;
                let data = doc.identity.clone();
                doc.push(Page::Cover { data });
            } else {
                doc.push(page);
            }
        }
        if !seen_cover && doc.identity != UserIdentity::default() {
            doc.sync_cover();
        }
        Ok(doc)
    }

    /// Serialize to the persisted JSON shape (pretty-printed).
    pub fn to_payload(&self) -> Result<String, PayloadError> {
        let payload = PayloadRef {
            user_info: &self.identity,
            pages: self.pages().collect(),
        };
        Ok(serde_json::to_string_pretty(&payload)?)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn identity(&self) -> &UserIdentity {
        &self.identity
    }

    pub fn pages(&self) -> impl Iterator<Item = &Page> {
        self.entries.iter().map(|e| &e.page)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn page(&self, index: usize) -> Option<&Page> {
        self.entries.get(index).map(|e| &e.page)
    }

    pub fn page_id(&self, index: usize) -> Option<PageId> {
        self.entries.get(index).map(|e| e.id)
    }

    /// Current index of a page, if it still exists.
    pub fn index_of(&self, id: PageId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    pub fn page_by_id(&self, id: PageId) -> Option<&Page> {
        self.entries.iter().find(|e| e.id == id).map(|e| &e.page)
    }

    pub fn single_count(&self) -> usize {
        self.pages()
            .filter(|p| matches!(p, Page::Single { .. }))
            .count()
    }

    fn check_index(&self, index: usize) -> Result<(), DocumentError> {
        if index < self.entries.len() {
            Ok(())
        } else {
            Err(DocumentError::IndexOutOfRange {
                index,
                len: self.entries.len(),
            })
        }
    }

    fn push(&mut self, page: Page) -> PageId {
        let id = self.allocate_id();
        self.entries.push(Entry { id, page });
        id
    }

    fn allocate_id(&mut self) -> PageId {
        let id = PageId(self.next_id);
        self.next_id += 1;
        id
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Replace the identity and re-synthesize the cover page.
    pub fn set_identity(&mut self, identity: UserIdentity) {
        self.identity = identity;
        self.sync_cover();
    }

    fn sync_cover(&mut self) {
        let data = self.identity.clone();
        match self
            .entries
            .iter_mut()
            .find(|e| matches!(e.page, Page::Cover { .. }))
        {
            Some(entry) => entry.page = Page::Cover { data },
            None => {
                let id = self.allocate_id();
                self.entries.insert(
                    0,
                    Entry {
                        id,
                        page: Page::Cover { data },
                    },
                );
            }
        }
    }

    /// Append a single-image page. The title defaults to
    /// `"Image <n>"` with n = 1 + existing single pages.
    pub fn append_single_page(
        &mut self,
        image: Option<ImageData>,
        title: Option<String>,
        year: Option<String>,
        desc: Option<String>,
    ) -> PageId {
        let title = title.unwrap_or_else(|| format!("Image {}", self.single_count() + 1));
        self.push(Page::Single {
            data: ImageText {
                title,
                year: year.unwrap_or_default(),
                desc: desc.unwrap_or_default(),
            },
            image,
        })
    }

    /// Append a series cover followed by `image_count` series images.
    ///
    /// The series title doubles as the grouping key. Returns the ids of the
    /// cover and of each image, in order.
    pub fn append_series(
        &mut self,
        title: &str,
        year: &str,
        desc: &str,
        image_count: usize,
    ) -> (PageId, Vec<PageId>) {
        let cover = self.push(Page::SeriesCover {
            data: SeriesText {
                title: title.to_string(),
                year: year.to_string(),
                desc: desc.to_string(),
                total: image_count,
            },
            series_key: title.to_string(),
        });
        let images = (1..=image_count)
            .map(|n| {
                self.push(Page::SeriesImage {
                    data: ImageText {
                        title: format!("Image {n}"),
                        ..Default::default()
                    },
                    image: None,
                    series_key: title.to_string(),
                    series_total: image_count,
                })
            })
            .collect();
        (cover, images)
    }

    /// Attach an image to the page at `index`, setting its year when one was
    /// extracted.
    pub fn set_page_image(
        &mut self,
        index: usize,
        image: ImageData,
        year: Option<String>,
    ) -> Result<(), DocumentError> {
        self.check_index(index)?;
        match &mut self.entries[index].page {
            Page::Single {
                data, image: slot, ..
            }
            | Page::SeriesImage {
                data, image: slot, ..
            } => {
                *slot = Some(image);
                if let Some(year) = year {
                    data.year = year;
                }
                Ok(())
            }
            other => Err(DocumentError::NoImageSlot(other.kind().as_str())),
        }
    }

    /// Commit an inline text edit. The value is trimmed.
    ///
    /// Cover fields are two-way bound: the identity is updated and the cover
    /// re-synced from it.
    pub fn edit_field(
        &mut self,
        index: usize,
        field: PageField,
        value: &str,
    ) -> Result<(), DocumentError> {
        self.check_index(index)?;
        let value = value.trim().to_string();
        let kind = self.entries[index].page.kind().as_str();
        let not_applicable = DocumentError::FieldNotApplicable { kind, field };

        if matches!(self.entries[index].page, Page::Cover { .. }) {
            let target = identity_field(&mut self.identity, field).ok_or(not_applicable)?;
            *target = value;
            self.sync_cover();
        } else {
            let target = text_field(&mut self.entries[index].page, field).ok_or(not_applicable)?;
            *target = value;
        }
        Ok(())
    }

    /// Exchange two pages. Indices must be in range and distinct.
    pub fn swap(&mut self, i: usize, j: usize) -> Result<(), DocumentError> {
        self.check_index(i)?;
        self.check_index(j)?;
        if i == j {
            return Err(DocumentError::SameIndex(i));
        }
        self.entries.swap(i, j);
        Ok(())
    }

    /// Remove one page. Series members of a deleted series cover stay.
    pub fn delete_page(&mut self, index: usize) -> Result<Page, DocumentError> {
        self.check_index(index)?;
        Ok(self.entries.remove(index).page)
    }

    /// Remove a series cover together with the series images that directly
    /// follow it under the same key.
    pub fn delete_series(&mut self, index: usize) -> Result<Vec<Page>, DocumentError> {
        self.check_index(index)?;
        let key = match &self.entries[index].page {
            Page::SeriesCover { series_key, .. } => series_key.clone(),
            _ => return Err(DocumentError::NotSeriesCover(index)),
        };
        let members = self.entries[index + 1..]
            .iter()
            .take_while(|e| {
                matches!(&e.page, Page::SeriesImage { series_key, .. } if *series_key == key)
            })
            .count();
        Ok(self
            .entries
            .drain(index..=index + members)
            .map(|e| e.page)
            .collect())
    }

    // =========================================================================
    // Derived values
    // =========================================================================

    /// 1-based position of each series image within its series, in one pass.
    ///
    /// The ordinal counts same-key series images at or before the page.
    /// Non-series-image pages get `None`.
    pub fn series_ordinals(&self) -> Vec<Option<usize>> {
        let mut seen: HashMap<&str, usize> = HashMap::new();
        self.pages()
            .map(|page| match page {
                Page::SeriesImage { series_key, .. } => {
                    let n = seen.entry(series_key.as_str()).or_insert(0);
                    *n += 1;
                    Some(*n)
                }
                _ => None,
            })
            .collect()
    }

    /// Ordinal of a single page; 0 when the index is not a series image.
    pub fn ordinal_at(&self, index: usize) -> usize {
        let Some(Page::SeriesImage { series_key, .. }) = self.page(index) else {
            return 0;
        };
        self.pages()
            .take(index + 1)
            .filter(|p| matches!(p, Page::SeriesImage { series_key: k, .. } if k == series_key))
            .count()
    }

    /// Series layout problems: images not preceded by their cover block, and
    /// series whose members are not contiguous.
    pub fn series_layout_issues(&self) -> Vec<SeriesIssue> {
        let mut issues = Vec::new();
        let mut finished: Vec<&str> = Vec::new();
        let mut current: Option<&str> = None;

        for (index, page) in self.pages().enumerate() {
            match page {
                Page::SeriesCover { series_key, .. } => {
                    let key = series_key.as_str();
                    if let Some(open) = current.take() {
                        finished.push(open);
                    }
                    if finished.contains(&key) {
                        issues.push(SeriesIssue::Split {
                            key: key.to_string(),
                            index,
                        });
                    }
                    current = Some(key);
                }
                Page::SeriesImage { series_key, .. } => {
                    let key = series_key.as_str();
                    if current == Some(key) {
                        continue;
                    }
                    if let Some(open) = current.take() {
                        finished.push(open);
                    }
                    let key_owned = key.to_string();
                    issues.push(if finished.contains(&key) {
                        SeriesIssue::Split {
                            key: key_owned,
                            index,
                        }
                    } else {
                        SeriesIssue::Orphaned {
                            key: key_owned,
                            index,
                        }
                    });
                    current = Some(key);
                }
                Page::Cover { .. } | Page::Single { .. } => {
                    if let Some(open) = current.take() {
                        finished.push(open);
                    }
                }
            }
        }
        issues
    }
}

fn identity_field(identity: &mut UserIdentity, field: PageField) -> Option<&mut String> {
    match field {
        PageField::Name => Some(&mut identity.name),
        PageField::Years => Some(&mut identity.years),
        PageField::Statement => Some(&mut identity.statement),
        PageField::Username => Some(&mut identity.username),
        PageField::Email => Some(&mut identity.email),
        PageField::PortfolioLabel => Some(&mut identity.portfolio_label),
        PageField::Title | PageField::Year | PageField::Desc => None,
    }
}

fn text_field(page: &mut Page, field: PageField) -> Option<&mut String> {
    let (title, year, desc) = match page {
        Page::Single { data, .. } | Page::SeriesImage { data, .. } => {
            (&mut data.title, &mut data.year, &mut data.desc)
        }
        Page::SeriesCover { data, .. } => (&mut data.title, &mut data.year, &mut data.desc),
        Page::Cover { .. } => return None,
    };
    match field {
        PageField::Title => Some(title),
        PageField::Year => Some(year),
        PageField::Desc => Some(desc),
        _ => None,
    }
}

/// A series layout problem found by [`Document::series_layout_issues`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeriesIssue {
    /// A series image with no cover directly above its block.
    Orphaned { key: String, index: usize },
    /// A series continued after other pages interrupted it.
    Split { key: String, index: usize },
}

impl fmt::Display for SeriesIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesIssue::Orphaned { key, index } => {
                write!(f, "page {} belongs to series '{key}' but has no cover", index + 1)
            }
            SeriesIssue::Split { key, index } => {
                write!(f, "series '{key}' is interrupted before page {}", index + 1)
            }
        }
    }
}

/// Inline-editable text fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageField {
    Name,
    Years,
    Statement,
    Username,
    Email,
    PortfolioLabel,
    Title,
    Year,
    Desc,
}

impl PageField {
    pub fn as_str(self) -> &'static str {
        match self {
            PageField::Name => "name",
            PageField::Years => "years",
            PageField::Statement => "statement",
            PageField::Username => "username",
            PageField::Email => "email",
            PageField::PortfolioLabel => "portfolio-label",
            PageField::Title => "title",
            PageField::Year => "year",
            PageField::Desc => "desc",
        }
    }
}

impl fmt::Display for PageField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "name" => PageField::Name,
            "years" => PageField::Years,
            "statement" => PageField::Statement,
            "username" => PageField::Username,
            "email" => PageField::Email,
            "portfolio-label" | "label" => PageField::PortfolioLabel,
            "title" => PageField::Title,
            "year" => PageField::Year,
            "desc" | "description" => PageField::Desc,
            other => return Err(format!("unknown field '{other}'")),
        })
    }
}
