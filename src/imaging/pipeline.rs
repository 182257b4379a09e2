//! Background image ingestion.
//!
//! Reading a file, base64-encoding it and scanning its EXIF block happen on a
//! dedicated rayon pool. Each job carries an [`ImageTicket`]; completions come
//! back over an mpsc channel and are collected with [`ImagePipeline::drain`]
//! or [`ImagePipeline::wait`].
//!
//! ## Staleness
//!
//! Every submission for a page issues a new generation. Only a completion
//! whose ticket is still the latest issued for its page is current; anything
//! older is stale and must be dropped, whatever order the jobs finish in.
//! [`ImagePipeline::invalidate_all`] makes every outstanding ticket stale,
//! which is what loading or replacing the document needs.
//!
//! Tickets name pages by [`PageId`], not index, so a completion for a page
//! that was moved still lands on it, and one for a deleted page finds nothing.

use super::data_uri::ImageData;
use super::exif_parser::extract_capture_year;
use crate::types::PageId;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to start image workers: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Identifies one image submission for one page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageTicket {
    pub page: PageId,
    pub generation: u64,
}

/// A successfully ingested image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedImage {
    pub data: ImageData,
    /// Four-digit capture year, when the file carries one.
    pub year: Option<String>,
}

/// A finished job, current or not.
#[derive(Debug)]
pub struct ProcessedResult {
    pub ticket: ImageTicket,
    pub source: PathBuf,
    pub outcome: Result<ProcessedImage, PipelineError>,
}

pub struct ImagePipeline {
    pool: rayon::ThreadPool,
    tx: Sender<ProcessedResult>,
    rx: Receiver<ProcessedResult>,
    latest: HashMap<PageId, u64>,
    next_generation: u64,
    in_flight: usize,
}

impl ImagePipeline {
    pub fn new(threads: usize) -> Result<Self, PipelineError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("folio-image-{i}"))
            .build()?;
        let (tx, rx) = mpsc::channel();
        Ok(Self {
            pool,
            tx,
            rx,
            latest: HashMap::new(),
            next_generation: 1,
            in_flight: 0,
        })
    }

    /// Issue a new ticket for `page`, superseding any earlier one.
    pub fn issue(&mut self, page: PageId) -> ImageTicket {
        let generation = self.next_generation;
        self.next_generation += 1;
        self.latest.insert(page, generation);
        ImageTicket { page, generation }
    }

    /// Queue the file at `source` for ingestion into `page`.
    pub fn submit(&mut self, page: PageId, source: &Path) -> ImageTicket {
        let path = source.to_path_buf();
        self.spawn(page, source.to_path_buf(), move || ingest(&path))
    }

    /// Queue an in-memory image (e.g. a dropped buffer) for `page`. `name`
    /// is only used as an extension hint and in messages.
    pub fn submit_bytes(&mut self, page: PageId, name: &Path, bytes: Vec<u8>) -> ImageTicket {
        let hint = name.to_path_buf();
        self.spawn(page, name.to_path_buf(), move || {
            Ok(ingest_bytes(&hint, &bytes))
        })
    }

    fn spawn<F>(&mut self, page: PageId, source: PathBuf, job: F) -> ImageTicket
    where
        F: FnOnce() -> Result<ProcessedImage, PipelineError> + Send + 'static,
    {
        let ticket = self.issue(page);
        let tx = self.tx.clone();
        self.in_flight += 1;
        tracing::debug!(
            page = ticket.page.0,
            generation = ticket.generation,
            source = %source.display(),
            "queued image"
        );
        self.pool.spawn(move || {
            let outcome = job();
            // Receiver gone means the pipeline was dropped; nothing to report to.
            let _ = tx.send(ProcessedResult {
                ticket,
                source,
                outcome,
            });
        });
        ticket
    }

    /// Whether `ticket` is the latest issued for its page.
    pub fn is_current(&self, ticket: ImageTicket) -> bool {
        self.latest.get(&ticket.page) == Some(&ticket.generation)
    }

    /// Retire a current ticket once its result has been applied.
    pub fn settle(&mut self, ticket: ImageTicket) {
        if self.is_current(ticket) {
            self.latest.remove(&ticket.page);
        }
    }

    /// Make every outstanding ticket stale.
    pub fn invalidate_all(&mut self) {
        self.latest.clear();
    }

    /// Jobs submitted but not yet collected, stale ones included.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    /// Collect whatever has finished without blocking.
    pub fn drain(&mut self) -> Vec<ProcessedResult> {
        let done: Vec<_> = self.rx.try_iter().collect();
        self.in_flight -= done.len();
        done
    }

    /// Block until every submitted job has finished.
    pub fn wait(&mut self) -> Vec<ProcessedResult> {
        let mut done = Vec::with_capacity(self.in_flight);
        while self.in_flight > 0 {
            match self.rx.recv() {
                Ok(result) => {
                    self.in_flight -= 1;
                    done.push(result);
                }
                Err(_) => break,
            }
        }
        done
    }
}

/// Read one file and turn it into a data URI plus capture year.
pub fn ingest(source: &Path) -> Result<ProcessedImage, PipelineError> {
    let bytes = std::fs::read(source).map_err(|e| PipelineError::Read {
        path: source.to_path_buf(),
        source: e,
    })?;
    Ok(ingest_bytes(source, &bytes))
}

fn ingest_bytes(name: &Path, bytes: &[u8]) -> ProcessedImage {
    ProcessedImage {
        data: ImageData::from_file_bytes(name, bytes),
        year: extract_capture_year(bytes),
    }
}
