//! Image ingestion: file bytes in, data URI and capture year out.
//!
//! | Step | Crate / function |
//! |---|---|
//! | **MIME sniffing** | `image::guess_format` |
//! | **Encoding** | `base64` standard engine |
//! | **Capture year** | custom parser (JPEG APP1 + TIFF IFD) |
//! | **Background work** | rayon thread pool + mpsc channel |
//!
//! The module is split into:
//! - **Data URI**: [`ImageData`], the inline form images are stored in
//! - **EXIF parser**: `DateTimeOriginal` year extraction
//! - **Pipeline**: [`ImagePipeline`], tickets and stale-result detection

pub mod data_uri;
pub(crate) mod exif_parser;
pub mod pipeline;

pub use data_uri::{DataUriError, ImageData, supported_extensions};
pub use exif_parser::extract_capture_year;
pub use pipeline::{ImagePipeline, ImageTicket, PipelineError, ProcessedImage, ProcessedResult};
