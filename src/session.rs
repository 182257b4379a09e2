//! The editing session: one controller owning the document and everything
//! that reacts to it.
//!
//! A [`Session`] holds the [`Document`], the dirty flag, the autosave timer,
//! the image pipeline and the persistence bridge. All mutations go through
//! it, on one thread; background image work only produces results that the
//! session applies when it is pumped ([`Session::pump`],
//! [`Session::wait_for_pending`]).
//!
//! ## Dirty tracking and autosave
//!
//! Every mutation sets the dirty flag and, when autosave is enabled and the
//! document has a file, re-arms the debounce timer. Only a successful save
//! clears the flag. [`Session::tick_at`] fires the deferred save once the
//! timer expires.
//!
//! ## Replacing the document
//!
//! Loading, opening and creating a new document cancel the autosave timer and
//! invalidate outstanding image work, so nothing meant for the old document
//! can land in or overwrite the new one. A payload that fails to parse leaves
//! the current document untouched and produces a [`SessionEvent::Notice`].
//!
//! ## Confirmation flow
//!
//! `New` and exit on a dirty document return [`Prompt`] and wait for an
//! [`ExitChoice`] through [`Session::resolve_prompt`]. Choosing save runs the
//! save first; the pending action only proceeds if it completed.

use crate::autosave::Autosave;
use crate::config::{AppConfig, PageSize, effective_threads};
use crate::document::{Document, DocumentError, PageField, PayloadError};
use crate::imaging::{ImagePipeline, ImageTicket, PipelineError, ProcessedResult};
use crate::persistence::{BridgeError, Opened, Outcome, PersistenceBridge, RecentState};
use crate::render;
use crate::theme::{ThemeField, ThemeOverrides, normalize_preset_key};
use crate::types::{IdentityForm, Page, PageId, UserIdentity};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Bridge(#[from] BridgeError),
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("no pending confirmation to resolve")]
    NoPrompt,
}

/// Notifications for whoever drives the session (UI, CLI).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    DirtyChanged(bool),
    Saved(PathBuf),
    /// User-visible message, e.g. a failed load or save.
    Notice(String),
}

/// Inbound menu commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    New,
    Open,
    Save,
    ExportPdf,
    Preferences,
}

/// What handling a menu action led to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuOutcome {
    Done,
    Canceled,
    /// The document is dirty; ask, then call [`Session::resolve_prompt`].
    Confirm(Prompt),
    /// Preferences live outside the session; the caller shows them.
    ShowPreferences,
}

/// An action waiting on the user's save/discard/cancel answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    New,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitChoice {
    Save,
    Discard,
    Cancel,
}

/// Answer to an exit request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDecision {
    /// The process may terminate.
    Exit,
    /// Unsaved changes; ask the user.
    Confirm,
}

/// Session tunables, usually taken from `folio.toml`.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub autosave: bool,
    pub autosave_delay: Duration,
    pub threads: usize,
    pub page_size: PageSize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            autosave: false,
            autosave_delay: crate::autosave::DEFAULT_DELAY,
            threads: 1,
            page_size: PageSize::default(),
        }
    }
}

impl SessionOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            autosave: config.preferences.autosave,
            autosave_delay: Duration::from_millis(config.autosave.delay_ms),
            threads: effective_threads(&config.processing),
            page_size: config.export.page_size,
        }
    }
}

pub struct Session<B: PersistenceBridge> {
    document: Document,
    bridge: B,
    path: Option<PathBuf>,
    dirty: bool,
    autosave_enabled: bool,
    autosave: Autosave,
    pipeline: ImagePipeline,
    page_size: PageSize,
    prompt: Option<Prompt>,
    events: Option<Sender<SessionEvent>>,
}

impl<B: PersistenceBridge> Session<B> {
    pub fn new(bridge: B, options: SessionOptions) -> Result<Self, SessionError> {
        Ok(Self {
            document: Document::new(),
            bridge,
            path: None,
            dirty: false,
            autosave_enabled: options.autosave,
            autosave: Autosave::new(options.autosave_delay),
            pipeline: ImagePipeline::new(options.threads)?,
            page_size: options.page_size,
            prompt: None,
            events: None,
        })
    }

    /// Start receiving [`SessionEvent`]s. Replaces any earlier subscriber.
    pub fn subscribe(&mut self) -> Receiver<SessionEvent> {
        let (tx, rx) = mpsc::channel();
        self.events = Some(tx);
        rx
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(tx) = &self.events {
            // A dropped receiver just means nobody is listening.
            let _ = tx.send(event);
        }
    }

    fn notice(&self, message: String) {
        tracing::warn!("{message}");
        self.emit(SessionEvent::Notice(message));
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn bridge(&self) -> &B {
        &self.bridge
    }

    pub fn bridge_mut(&mut self) -> &mut B {
        &mut self.bridge
    }

    pub fn pending_prompt(&self) -> Option<Prompt> {
        self.prompt
    }

    pub fn pending_images(&self) -> usize {
        self.pipeline.in_flight()
    }

    pub fn autosave_armed(&self) -> bool {
        self.autosave.is_armed()
    }

    pub fn set_autosave_enabled(&mut self, enabled: bool) {
        self.autosave_enabled = enabled;
        if !enabled {
            self.autosave.cancel();
        }
    }

    /// The full current payload, for a final save on exit.
    pub fn payload(&self) -> Result<String, SessionError> {
        Ok(self.document.to_payload()?)
    }

    // =========================================================================
    // Dirty flag
    // =========================================================================

    fn set_dirty(&mut self, dirty: bool) {
        if self.dirty != dirty {
            self.dirty = dirty;
            self.emit(SessionEvent::DirtyChanged(dirty));
        }
    }

    fn mark_dirty(&mut self) {
        self.set_dirty(true);
        if self.autosave_enabled && self.path.is_some() {
            self.autosave.arm();
        }
    }

    // =========================================================================
    // Identity and theme
    // =========================================================================

    pub fn set_identity(&mut self, identity: UserIdentity) {
        self.document.set_identity(identity);
        self.mark_dirty();
    }

    pub fn apply_identity_form(&mut self, form: IdentityForm) {
        let identity = form.apply_to(self.document.identity());
        self.set_identity(identity);
    }

    /// Switch preset; customizations of the old preset are discarded.
    pub fn set_theme_preset(&mut self, raw: &str) {
        let mut identity = self.document.identity().clone();
        let next = normalize_preset_key(raw);
        identity.theme = identity.theme.switch_preset(identity.theme_preset, next);
        identity.theme_preset = next;
        self.set_identity(identity);
    }

    /// Merge overrides into the current preset's theme.
    pub fn customize_theme(&mut self, overrides: &ThemeOverrides) {
        let mut identity = self.document.identity().clone();
        identity.theme = identity.theme.with_overrides(overrides);
        self.set_identity(identity);
    }

    pub fn reset_theme_field(&mut self, field: ThemeField) {
        let mut identity = self.document.identity().clone();
        identity.theme.reset_field(identity.theme_preset, field);
        self.set_identity(identity);
    }

    // =========================================================================
    // Pages
    // =========================================================================

    pub fn append_single_page(
        &mut self,
        title: Option<String>,
        year: Option<String>,
        desc: Option<String>,
    ) -> PageId {
        let id = self.document.append_single_page(None, title, year, desc);
        self.mark_dirty();
        id
    }

    pub fn append_series(
        &mut self,
        title: &str,
        year: &str,
        desc: &str,
        image_count: usize,
    ) -> (PageId, Vec<PageId>) {
        let ids = self
            .document
            .append_series(title, year, desc, image_count);
        self.mark_dirty();
        ids
    }

    /// Append a series and queue `images` into its pages in order.
    ///
    /// `count` defaults to the number of images. Images beyond `count` are
    /// not added; each one produces a notice.
    pub fn append_series_with_images(
        &mut self,
        title: &str,
        year: &str,
        desc: &str,
        count: Option<usize>,
        images: &[PathBuf],
    ) -> (PageId, Vec<PageId>) {
        let count = count.unwrap_or(images.len());
        for skipped in images.iter().skip(count) {
            self.notice(format!(
                "Series '{title}' has {count} pages; skipped {}",
                skipped.display()
            ));
        }
        let (cover, pages) = self.append_series(title, year, desc, count);
        for (id, image) in pages.iter().zip(images) {
            self.pipeline.submit(*id, image);
        }
        (cover, pages)
    }

    pub fn edit_field(
        &mut self,
        index: usize,
        field: PageField,
        value: &str,
    ) -> Result<(), SessionError> {
        self.document.edit_field(index, field, value)?;
        self.mark_dirty();
        Ok(())
    }

    pub fn swap(&mut self, i: usize, j: usize) -> Result<(), SessionError> {
        self.document.swap(i, j)?;
        for issue in self.document.series_layout_issues() {
            tracing::warn!("{issue}");
        }
        self.mark_dirty();
        Ok(())
    }

    pub fn delete_page(&mut self, index: usize) -> Result<Page, SessionError> {
        let page = self.document.delete_page(index)?;
        for issue in self.document.series_layout_issues() {
            tracing::warn!("{issue}");
        }
        self.mark_dirty();
        Ok(page)
    }

    pub fn delete_series(&mut self, index: usize) -> Result<Vec<Page>, SessionError> {
        let pages = self.document.delete_series(index)?;
        self.mark_dirty();
        Ok(pages)
    }

    // =========================================================================
    // Images
    // =========================================================================

    fn image_target(&self, index: usize) -> Result<PageId, SessionError> {
        let (Some(page), Some(id)) = (self.document.page(index), self.document.page_id(index))
        else {
            return Err(DocumentError::IndexOutOfRange {
                index,
                len: self.document.len(),
            }
            .into());
        };
        if !page.accepts_image() {
            return Err(DocumentError::NoImageSlot(page.kind().as_str()).into());
        }
        Ok(id)
    }

    /// Start attaching the image file at `source` to page `index`.
    ///
    /// The page changes when the result is applied by [`Session::pump`] or
    /// [`Session::wait_for_pending`]. A later attach to the same page wins
    /// over this one regardless of which finishes first.
    pub fn attach_image(
        &mut self,
        index: usize,
        source: &Path,
    ) -> Result<ImageTicket, SessionError> {
        let id = self.image_target(index)?;
        Ok(self.pipeline.submit(id, source))
    }

    /// Like [`Session::attach_image`], for an image already in memory.
    pub fn attach_image_bytes(
        &mut self,
        index: usize,
        name: &Path,
        bytes: Vec<u8>,
    ) -> Result<ImageTicket, SessionError> {
        let id = self.image_target(index)?;
        Ok(self.pipeline.submit_bytes(id, name, bytes))
    }

    /// Bulk drop: one new single page per image, each filled in the
    /// background.
    pub fn add_images(&mut self, sources: &[PathBuf]) -> Vec<PageId> {
        let mut ids = Vec::with_capacity(sources.len());
        for source in sources {
            let id = self.document.append_single_page(None, None, None, None);
            self.pipeline.submit(id, source);
            ids.push(id);
        }
        if !ids.is_empty() {
            self.mark_dirty();
        }
        ids
    }

    /// Ask the bridge for image files and add them as new pages.
    pub fn add_images_from_dialog(&mut self) -> Result<Outcome<Vec<PageId>>, SessionError> {
        match self.bridge.select_image_files() {
            Ok(Outcome::Completed(files)) => Ok(Outcome::Completed(self.add_images(&files))),
            Ok(Outcome::Canceled) => Ok(Outcome::Canceled),
            Err(e) => {
                self.notice(format!("Could not select images: {e}"));
                Err(e.into())
            }
        }
    }

    /// Apply one finished image job. Returns whether the page changed.
    pub fn complete_image(&mut self, result: ProcessedResult) -> bool {
        let ticket = result.ticket;
        if !self.pipeline.is_current(ticket) {
            tracing::debug!(
                generation = ticket.generation,
                source = %result.source.display(),
                "dropping stale image result"
            );
            return false;
        }
        self.pipeline.settle(ticket);

        let Some(index) = self.document.index_of(ticket.page) else {
            tracing::debug!(source = %result.source.display(), "page deleted before image arrived");
            return false;
        };
        let image = match result.outcome {
            Ok(image) => image,
            Err(e) => {
                self.notice(format!("Could not load image: {e}"));
                return false;
            }
        };
        match self.document.set_page_image(index, image.data, image.year) {
            Ok(()) => {
                self.mark_dirty();
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "image result no longer fits its page");
                false
            }
        }
    }

    /// Apply whatever image work has finished. Returns the number applied.
    pub fn pump(&mut self) -> usize {
        let done = self.pipeline.drain();
        done.into_iter()
            .map(|result| self.complete_image(result))
            .filter(|applied| *applied)
            .count()
    }

    /// Block until all image work has finished and apply it.
    pub fn wait_for_pending(&mut self) -> usize {
        let done = self.pipeline.wait();
        done.into_iter()
            .map(|result| self.complete_image(result))
            .filter(|applied| *applied)
            .count()
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Save to the known path, or let the bridge choose one.
    pub fn save(&mut self) -> Result<Outcome<PathBuf>, SessionError> {
        let payload = self.document.to_payload()?;
        match self.bridge.save(&payload, self.path.as_deref()) {
            Ok(Outcome::Completed(path)) => {
                tracing::info!(path = %path.display(), "saved");
                self.path = Some(path.clone());
                self.autosave.cancel();
                self.set_dirty(false);
                self.emit(SessionEvent::Saved(path.clone()));
                Ok(Outcome::Completed(path))
            }
            Ok(Outcome::Canceled) => Ok(Outcome::Canceled),
            Err(e) => {
                self.notice(format!("Save failed: {e}"));
                Err(e.into())
            }
        }
    }

    /// Replace the document with a loaded payload.
    ///
    /// On a parse failure the current document stays as it was.
    pub fn load(&mut self, opened: Opened) -> Result<(), SessionError> {
        let document = match Document::from_payload(&opened.payload) {
            Ok(document) => document,
            Err(e) => {
                self.notice(format!(
                    "Could not open {}: {e}",
                    opened.path.display()
                ));
                return Err(e.into());
            }
        };
        self.replace_document(document, opened.path);
        Ok(())
    }

    fn replace_document(&mut self, document: Document, path: PathBuf) {
        tracing::info!(path = %path.display(), pages = document.len(), "document replaced");
        self.autosave.cancel();
        self.pipeline.invalidate_all();
        self.document = document;
        self.path = Some(path);
        self.prompt = None;
        self.set_dirty(false);
    }

    pub fn open(&mut self) -> Result<Outcome<PathBuf>, SessionError> {
        match self.bridge.open() {
            Ok(Outcome::Completed(opened)) => {
                let path = opened.path.clone();
                self.load(opened)?;
                Ok(Outcome::Completed(path))
            }
            Ok(Outcome::Canceled) => Ok(Outcome::Canceled),
            Err(e) => {
                self.notice(format!("Open failed: {e}"));
                Err(e.into())
            }
        }
    }

    pub fn open_at(&mut self, path: &Path) -> Result<(), SessionError> {
        match self.bridge.open_at(path) {
            Ok(opened) => self.load(opened),
            Err(e) => {
                self.notice(format!("Could not open {}: {e}", path.display()));
                Err(e.into())
            }
        }
    }

    /// Re-open the last portfolio, if there was one. Failure leaves the
    /// empty document.
    pub fn restore_recent(&mut self, recent: &RecentState) -> bool {
        let Some(path) = recent.last_portfolio_path.as_deref() else {
            return false;
        };
        match self.open_at(path) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "could not restore last portfolio"
                );
                false
            }
        }
    }

    /// Start a fresh document in a new file. A canceled or failed create
    /// keeps the current document.
    pub fn new_document(&mut self) -> Result<Outcome<PathBuf>, SessionError> {
        let fresh = Document::new();
        let payload = fresh.to_payload()?;
        match self.bridge.create_document(&payload) {
            Ok(Outcome::Completed(path)) => {
                self.replace_document(fresh, path.clone());
                Ok(Outcome::Completed(path))
            }
            Ok(Outcome::Canceled) => Ok(Outcome::Canceled),
            Err(e) => {
                self.notice(format!("Could not create portfolio: {e}"));
                Err(e.into())
            }
        }
    }

    /// Render and hand the document to the bridge's PDF export.
    pub fn export(&mut self) -> Result<Outcome<PathBuf>, SessionError> {
        let html = render::render_document(&self.document, self.page_size);
        match self.bridge.export_pdf(&html) {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                self.notice(format!("Export failed: {e}"));
                Err(e.into())
            }
        }
    }

    /// Fire the autosave if its quiet period has elapsed at `now`.
    pub fn tick_at(&mut self, now: Instant) -> Result<bool, SessionError> {
        if !self.autosave.tick_at(now) {
            return Ok(false);
        }
        if !self.autosave_enabled || self.path.is_none() {
            return Ok(false);
        }
        tracing::debug!("autosave");
        self.save()?;
        Ok(true)
    }

    // =========================================================================
    // Menu and exit flow
    // =========================================================================

    pub fn handle_menu(&mut self, action: MenuAction) -> Result<MenuOutcome, SessionError> {
        let outcome = match action {
            MenuAction::New if self.dirty => {
                self.prompt = Some(Prompt::New);
                return Ok(MenuOutcome::Confirm(Prompt::New));
            }
            MenuAction::New => self.new_document()?.completed().map(|_| ()),
            MenuAction::Open => self.open()?.completed().map(|_| ()),
            MenuAction::Save => self.save()?.completed().map(|_| ()),
            MenuAction::ExportPdf => self.export()?.completed().map(|_| ()),
            MenuAction::Preferences => return Ok(MenuOutcome::ShowPreferences),
        };
        Ok(match outcome {
            Some(()) => MenuOutcome::Done,
            None => MenuOutcome::Canceled,
        })
    }

    pub fn request_exit(&mut self) -> ExitDecision {
        if self.dirty {
            self.prompt = Some(Prompt::Exit);
            ExitDecision::Confirm
        } else {
            ExitDecision::Exit
        }
    }

    /// Answer the pending prompt. Returns whether the pending action went
    /// ahead; for [`Prompt::Exit`] that means the process may terminate.
    pub fn resolve_prompt(&mut self, choice: ExitChoice) -> Result<bool, SessionError> {
        let prompt = self.prompt.take().ok_or(SessionError::NoPrompt)?;
        match choice {
            ExitChoice::Cancel => return Ok(false),
            ExitChoice::Save => match self.save() {
                Ok(Outcome::Completed(_)) => {}
                Ok(Outcome::Canceled) => return Ok(false),
                Err(e) => {
                    tracing::warn!(error = %e, "save before {prompt:?} failed");
                    return Ok(false);
                }
            },
            ExitChoice::Discard => {}
        }
        match prompt {
            Prompt::Exit => {
                self.autosave.cancel();
                Ok(true)
            }
            Prompt::New => Ok(self.new_document()?.completed().is_some()),
        }
    }
}
