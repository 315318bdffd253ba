//! Domain models.

pub mod job;
pub mod preview;

pub use job::{ConversionJob, JobStatus, QueuedJob};
pub use preview::{DocumentPreviewRecord, PreviewStatus};
