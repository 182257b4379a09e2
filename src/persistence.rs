//! The persistence bridge: everything the session needs from the outside
//! world to save, load, export and pick images.
//!
//! The session only talks to the [`PersistenceBridge`] trait. Every
//! user-facing operation distinguishes cancellation from failure:
//! `Ok(Outcome::Canceled)` means the user backed out and nothing should
//! happen, `Err(_)` means something went wrong and should be reported.
//!
//! [`FileBridge`] is the filesystem implementation used by the CLI. Where a
//! desktop shell would show a dialog, it uses answers supplied up front:
//! a save target, an open target, image sources and an export target. A
//! missing answer behaves like a dismissed dialog, except that saving and
//! creating fall back to a fresh `Portfolio.json` / `Portfolio 2.json` / ...
//! in the base directory.
//!
//! PDF rendering itself is delegated: the rendered HTML is written to a
//! temporary file and handed to the configured print command.

use crate::config::ExportConfig;
use crate::imaging::supported_extensions;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("No print command configured; set export.print_command in folio.toml")]
    NoPrintCommand,
    #[error("Print command is empty")]
    EmptyPrintCommand,
    #[error("Print command `{command}` failed: {status}")]
    PrintFailed { command: String, status: ExitStatus },
}

/// Result of a user-facing operation that can be dismissed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Completed(T),
    Canceled,
}

impl<T> Outcome<T> {
    pub fn completed(self) -> Option<T> {
        match self {
            Outcome::Completed(value) => Some(value),
            Outcome::Canceled => None,
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, Outcome::Canceled)
    }
}

/// A loaded payload and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opened {
    pub payload: String,
    pub path: PathBuf,
}

pub trait PersistenceBridge {
    /// Create a new document file holding `payload`.
    fn create_document(&mut self, payload: &str) -> Result<Outcome<PathBuf>, BridgeError>;

    /// Save `payload` to `known_path`, or to a newly chosen location.
    fn save(
        &mut self,
        payload: &str,
        known_path: Option<&Path>,
    ) -> Result<Outcome<PathBuf>, BridgeError>;

    /// Let the user pick a document to open.
    fn open(&mut self) -> Result<Outcome<Opened>, BridgeError>;

    /// Open a known document without asking.
    fn open_at(&mut self, path: &Path) -> Result<Opened, BridgeError>;

    /// Print rendered `html` to a PDF.
    fn export_pdf(&mut self, html: &str) -> Result<Outcome<PathBuf>, BridgeError>;

    /// Let the user pick image files.
    fn select_image_files(&mut self) -> Result<Outcome<Vec<PathBuf>>, BridgeError>;
}

// ============================================================================
// FileBridge
// ============================================================================

/// Filesystem-backed bridge with pre-supplied dialog answers.
#[derive(Debug, Clone)]
pub struct FileBridge {
    base_dir: PathBuf,
    save_target: Option<PathBuf>,
    open_target: Option<PathBuf>,
    image_sources: Vec<PathBuf>,
    export_target: Option<PathBuf>,
    export: ExportConfig,
}

impl FileBridge {
    pub fn new(base_dir: impl Into<PathBuf>, export: ExportConfig) -> Self {
        Self {
            base_dir: base_dir.into(),
            save_target: None,
            open_target: None,
            image_sources: Vec::new(),
            export_target: None,
            export,
        }
    }

    /// Where the next create or unsaved save writes. Used once.
    pub fn set_save_target(&mut self, path: impl Into<PathBuf>) {
        self.save_target = Some(path.into());
    }

    /// What the next `open` returns. Used once.
    pub fn set_open_target(&mut self, path: impl Into<PathBuf>) {
        self.open_target = Some(path.into());
    }

    /// Files or directories offered by the next image selection.
    pub fn set_image_sources(&mut self, sources: Vec<PathBuf>) {
        self.image_sources = sources;
    }

    /// Where the next export writes. Used once.
    pub fn set_export_target(&mut self, path: impl Into<PathBuf>) {
        self.export_target = Some(path.into());
    }

    fn choose_target(&mut self) -> PathBuf {
        self.save_target
            .take()
            .unwrap_or_else(|| unique_default_path(&self.base_dir))
    }
}

impl PersistenceBridge for FileBridge {
    fn create_document(&mut self, payload: &str) -> Result<Outcome<PathBuf>, BridgeError> {
        let path = self.choose_target();
        write_payload(&path, payload)?;
        tracing::info!(path = %path.display(), "created portfolio");
        Ok(Outcome::Completed(path))
    }

    fn save(
        &mut self,
        payload: &str,
        known_path: Option<&Path>,
    ) -> Result<Outcome<PathBuf>, BridgeError> {
        let path = match known_path {
            Some(path) => path.to_path_buf(),
            None => self.choose_target(),
        };
        write_payload(&path, payload)?;
        tracing::debug!(path = %path.display(), bytes = payload.len(), "saved portfolio");
        Ok(Outcome::Completed(path))
    }

    fn open(&mut self) -> Result<Outcome<Opened>, BridgeError> {
        match self.open_target.take() {
            Some(path) => Ok(Outcome::Completed(self.open_at(&path)?)),
            None => Ok(Outcome::Canceled),
        }
    }

    fn open_at(&mut self, path: &Path) -> Result<Opened, BridgeError> {
        let payload = std::fs::read_to_string(path).map_err(|e| BridgeError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(Opened {
            payload,
            path: path.to_path_buf(),
        })
    }

    fn export_pdf(&mut self, html: &str) -> Result<Outcome<PathBuf>, BridgeError> {
        let Some(output) = self.export_target.take() else {
            return Ok(Outcome::Canceled);
        };
        let template = self
            .export
            .print_command
            .as_deref()
            .ok_or(BridgeError::NoPrintCommand)?;

        let input = std::env::temp_dir().join(format!("folio-export-{}.html", std::process::id()));
        std::fs::write(&input, html).map_err(|e| BridgeError::Write {
            path: input.clone(),
            source: e,
        })?;
        let result = run_print_command(template, &input, &output);
        if let Err(e) = std::fs::remove_file(&input) {
            tracing::debug!(path = %input.display(), error = %e, "could not remove export input");
        }
        result?;

        tracing::info!(path = %output.display(), "exported PDF");
        Ok(Outcome::Completed(output))
    }

    fn select_image_files(&mut self) -> Result<Outcome<Vec<PathBuf>>, BridgeError> {
        let sources = std::mem::take(&mut self.image_sources);
        if sources.is_empty() {
            return Ok(Outcome::Canceled);
        }
        let files = collect_image_files(&sources)?;
        if files.is_empty() {
            return Ok(Outcome::Canceled);
        }
        Ok(Outcome::Completed(files))
    }
}

fn write_payload(path: &Path, payload: &str) -> Result<(), BridgeError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| BridgeError::Write {
            path: path.to_path_buf(),
            source: e,
        })?;
    }
    std::fs::write(path, payload).map_err(|e| BridgeError::Write {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Substitute `{input}` / `{output}` into each argument and run the command.
fn run_print_command(template: &str, input: &Path, output: &Path) -> Result<(), BridgeError> {
    let args: Vec<String> = template
        .split_whitespace()
        .map(|arg| {
            arg.replace("{input}", &input.to_string_lossy())
                .replace("{output}", &output.to_string_lossy())
        })
        .collect();
    let (program, rest) = args.split_first().ok_or(BridgeError::EmptyPrintCommand)?;

    tracing::debug!(command = %args.join(" "), "running print command");
    let status = Command::new(program).args(rest).status()?;
    if status.success() {
        Ok(())
    } else {
        Err(BridgeError::PrintFailed {
            command: template.to_string(),
            status,
        })
    }
}

/// First of `Portfolio.json`, `Portfolio 2.json`, ... that does not exist in
/// `dir`.
pub fn unique_default_path(dir: &Path) -> PathBuf {
    let first = dir.join("Portfolio.json");
    if !first.exists() {
        return first;
    }
    (2..)
        .map(|n| dir.join(format!("Portfolio {n}.json")))
        .find(|p| !p.exists())
        .unwrap_or(first)
}

fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .is_some_and(|ext| supported_extensions().any(|s| s == ext))
}

/// Expand files and directories into supported image files.
///
/// Explicit files keep their given order; each directory contributes its
/// images recursively in sorted path order.
pub fn collect_image_files(sources: &[PathBuf]) -> Result<Vec<PathBuf>, BridgeError> {
    let mut files = Vec::new();
    for source in sources {
        if source.is_dir() {
            let mut found = Vec::new();
            for entry in WalkDir::new(source).sort_by_file_name() {
                let entry = entry?;
                if entry.file_type().is_file() && is_supported_image(entry.path()) {
                    found.push(entry.into_path());
                }
            }
            files.extend(found);
        } else if is_supported_image(source) {
            files.push(source.clone());
        } else {
            tracing::warn!(path = %source.display(), "skipping unsupported file");
        }
    }
    Ok(files)
}

// ============================================================================
// Recent state
// ============================================================================

pub const RECENT_FILE: &str = "recent.json";

/// App state remembered between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecentState {
    pub last_portfolio_path: Option<PathBuf>,
    pub has_run: bool,
}

impl RecentState {
    /// Load from `config_dir`. Missing or unreadable state is a fresh start.
    pub fn load(config_dir: &Path) -> Self {
        let path = config_dir.join(RECENT_FILE);
        let Ok(content) = std::fs::read_to_string(&path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed recent state");
            Self::default()
        })
    }

    pub fn save(&self, config_dir: &Path) -> Result<(), BridgeError> {
        let json = serde_json::to_string_pretty(self)?;
        write_payload(&config_dir.join(RECENT_FILE), &json)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::collections::{HashMap, VecDeque};
    use tempfile::TempDir;

    pub const MOCK_PATH: &str = "/mock/Portfolio.json";

    /// Bridge that records calls and replays scripted results.
    ///
    /// Unscripted saves and creates succeed and keep the payload so a later
    /// `open_at` can read it back; unscripted dialogs are canceled.
    #[derive(Default)]
    pub struct MockBridge {
        pub operations: Vec<RecordedOp>,
        pub files: HashMap<PathBuf, String>,
        pub create_results: VecDeque<Result<Outcome<PathBuf>, BridgeError>>,
        pub save_results: VecDeque<Result<Outcome<PathBuf>, BridgeError>>,
        pub open_results: VecDeque<Result<Outcome<Opened>, BridgeError>>,
        pub export_results: VecDeque<Result<Outcome<PathBuf>, BridgeError>>,
        pub selections: VecDeque<Vec<PathBuf>>,
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum RecordedOp {
        Create,
        Save { known_path: Option<PathBuf> },
        Open,
        OpenAt(PathBuf),
        Export,
        SelectImages,
    }

    impl MockBridge {
        pub fn failure(message: &str) -> BridgeError {
            BridgeError::Io(std::io::Error::other(message.to_string()))
        }

        pub fn saves(&self) -> usize {
            self.operations
                .iter()
                .filter(|op| matches!(op, RecordedOp::Save { .. }))
                .count()
        }
    }

    impl PersistenceBridge for MockBridge {
        fn create_document(&mut self, payload: &str) -> Result<Outcome<PathBuf>, BridgeError> {
            self.operations.push(RecordedOp::Create);
            let result = self
                .create_results
                .pop_front()
                .unwrap_or_else(|| Ok(Outcome::Completed(PathBuf::from(MOCK_PATH))));
            if let Ok(Outcome::Completed(path)) = &result {
                self.files.insert(path.clone(), payload.to_string());
            }
            result
        }

        fn save(
            &mut self,
            payload: &str,
            known_path: Option<&Path>,
        ) -> Result<Outcome<PathBuf>, BridgeError> {
            self.operations.push(RecordedOp::Save {
                known_path: known_path.map(Path::to_path_buf),
            });
            let fallback = known_path.map_or_else(|| PathBuf::from(MOCK_PATH), Path::to_path_buf);
            let result = self
                .save_results
                .pop_front()
                .unwrap_or(Ok(Outcome::Completed(fallback)));
            if let Ok(Outcome::Completed(path)) = &result {
                self.files.insert(path.clone(), payload.to_string());
            }
            result
        }

        fn open(&mut self) -> Result<Outcome<Opened>, BridgeError> {
            self.operations.push(RecordedOp::Open);
            self.open_results.pop_front().unwrap_or(Ok(Outcome::Canceled))
        }

        fn open_at(&mut self, path: &Path) -> Result<Opened, BridgeError> {
            self.operations.push(RecordedOp::OpenAt(path.to_path_buf()));
            match self.files.get(path) {
                Some(payload) => Ok(Opened {
                    payload: payload.clone(),
                    path: path.to_path_buf(),
                }),
                None => Err(BridgeError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "no such mock file",
                ))),
            }
        }

        fn export_pdf(&mut self, _html: &str) -> Result<Outcome<PathBuf>, BridgeError> {
            self.operations.push(RecordedOp::Export);
            self.export_results
                .pop_front()
                .unwrap_or_else(|| Ok(Outcome::Completed(PathBuf::from("/mock/Portfolio.pdf"))))
        }

        fn select_image_files(&mut self) -> Result<Outcome<Vec<PathBuf>>, BridgeError> {
            self.operations.push(RecordedOp::SelectImages);
            Ok(match self.selections.pop_front() {
                Some(files) => Outcome::Completed(files),
                None => Outcome::Canceled,
            })
        }
    }

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, b"x").unwrap();
    }

    // =========================================================================
    // Default file names
    // =========================================================================

    #[test]
    fn unique_default_path_counts_up() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(
            unique_default_path(tmp.path()),
            tmp.path().join("Portfolio.json")
        );

        touch(&tmp.path().join("Portfolio.json"));
        assert_eq!(
            unique_default_path(tmp.path()),
            tmp.path().join("Portfolio 2.json")
        );

        touch(&tmp.path().join("Portfolio 2.json"));
        assert_eq!(
            unique_default_path(tmp.path()),
            tmp.path().join("Portfolio 3.json")
        );
    }

    // =========================================================================
    // FileBridge
    // =========================================================================

    #[test]
    fn create_then_save_then_open_at() {
        let tmp = TempDir::new().unwrap();
        let mut bridge = FileBridge::new(tmp.path(), ExportConfig::default());

        let path = bridge.create_document("{}").unwrap().completed().unwrap();
        assert_eq!(path, tmp.path().join("Portfolio.json"));

        let saved = bridge
            .save(r#"{"pages":[]}"#, Some(&path))
            .unwrap()
            .completed()
            .unwrap();
        assert_eq!(saved, path);

        let opened = bridge.open_at(&path).unwrap();
        assert_eq!(opened.payload, r#"{"pages":[]}"#);
    }

    #[test]
    fn save_without_path_uses_target_once() {
        let tmp = TempDir::new().unwrap();
        let mut bridge = FileBridge::new(tmp.path(), ExportConfig::default());
        bridge.set_save_target(tmp.path().join("nested/mine.json"));

        let first = bridge.save("{}", None).unwrap().completed().unwrap();
        let second = bridge.save("{}", None).unwrap().completed().unwrap();

        assert_eq!(first, tmp.path().join("nested/mine.json"));
        assert_eq!(second, tmp.path().join("Portfolio.json"));
    }

    #[test]
    fn open_without_target_is_canceled() {
        let tmp = TempDir::new().unwrap();
        let mut bridge = FileBridge::new(tmp.path(), ExportConfig::default());
        assert!(bridge.open().unwrap().is_canceled());
    }

    #[test]
    fn open_missing_file_is_error() {
        let tmp = TempDir::new().unwrap();
        let mut bridge = FileBridge::new(tmp.path(), ExportConfig::default());
        bridge.set_open_target(tmp.path().join("nope.json"));
        assert!(matches!(bridge.open(), Err(BridgeError::Read { .. })));
    }

    #[test]
    fn export_without_target_is_canceled() {
        let tmp = TempDir::new().unwrap();
        let mut bridge = FileBridge::new(tmp.path(), ExportConfig::default());
        assert!(bridge.export_pdf("<html></html>").unwrap().is_canceled());
    }

    #[test]
    fn export_without_print_command_is_error() {
        let tmp = TempDir::new().unwrap();
        let mut bridge = FileBridge::new(tmp.path(), ExportConfig::default());
        bridge.set_export_target(tmp.path().join("out.pdf"));
        assert!(matches!(
            bridge.export_pdf("<html></html>"),
            Err(BridgeError::NoPrintCommand)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn export_runs_print_command_with_placeholders() {
        let tmp = TempDir::new().unwrap();
        let export = ExportConfig {
            print_command: Some("cp {input} {output}".to_string()),
            ..ExportConfig::default()
        };
        let mut bridge = FileBridge::new(tmp.path(), export);
        let out = tmp.path().join("out.pdf");
        bridge.set_export_target(&out);

        let path = bridge.export_pdf("<p>hi</p>").unwrap().completed().unwrap();

        assert_eq!(path, out);
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "<p>hi</p>");
    }

    #[cfg(unix)]
    #[test]
    fn failing_print_command_is_error() {
        let tmp = TempDir::new().unwrap();
        let export = ExportConfig {
            print_command: Some("false {input}".to_string()),
            ..ExportConfig::default()
        };
        let mut bridge = FileBridge::new(tmp.path(), export);
        bridge.set_export_target(tmp.path().join("out.pdf"));
        assert!(matches!(
            bridge.export_pdf("<p></p>"),
            Err(BridgeError::PrintFailed { .. })
        ));
    }

    // =========================================================================
    // Image selection
    // =========================================================================

    #[test]
    fn collects_supported_images_from_dirs_and_files() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("shoot");
        touch(&dir.join("b.PNG"));
        touch(&dir.join("a.jpg"));
        touch(&dir.join("notes.txt"));
        touch(&dir.join("sub/c.webp"));
        let loose = tmp.path().join("loose.gif");
        touch(&loose);
        let ignored = tmp.path().join("readme.md");
        touch(&ignored);

        let files = collect_image_files(&[loose.clone(), dir.clone(), ignored]).unwrap();

        assert_eq!(
            files,
            vec![
                loose,
                dir.join("a.jpg"),
                dir.join("b.PNG"),
                dir.join("sub/c.webp"),
            ]
        );
    }

    #[test]
    fn selection_with_no_images_is_canceled() {
        let tmp = TempDir::new().unwrap();
        touch(&tmp.path().join("notes.txt"));
        let mut bridge = FileBridge::new(tmp.path(), ExportConfig::default());

        assert!(bridge.select_image_files().unwrap().is_canceled());

        bridge.set_image_sources(vec![tmp.path().to_path_buf()]);
        assert!(bridge.select_image_files().unwrap().is_canceled());
    }

    // =========================================================================
    // Recent state
    // =========================================================================

    #[test]
    fn recent_state_round_trip() {
        let tmp = TempDir::new().unwrap();
        let state = RecentState {
            last_portfolio_path: Some(tmp.path().join("Portfolio.json")),
            has_run: true,
        };
        state.save(tmp.path()).unwrap();
        assert_eq!(RecentState::load(tmp.path()), state);
    }

    #[test]
    fn recent_state_missing_or_malformed_is_default() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(RecentState::load(tmp.path()), RecentState::default());

        std::fs::write(tmp.path().join(RECENT_FILE), "not json").unwrap();
        assert_eq!(RecentState::load(tmp.path()), RecentState::default());
    }

    // =========================================================================
    // Mock
    // =========================================================================

    #[test]
    fn mock_keeps_saved_payloads() {
        let mut bridge = MockBridge::default();
        let path = bridge.save("{}", None).unwrap().completed().unwrap();
        assert_eq!(bridge.open_at(&path).unwrap().payload, "{}");
        assert_eq!(bridge.saves(), 1);
    }
}
