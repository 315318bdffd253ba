//! Docpreview DB Library
//!
//! Postgres repositories for the two durable structures of the pipeline: the
//! `conversion_jobs` queue table and the `document_previews` status record.

pub mod preview;
pub mod queue;

pub use preview::PreviewRepository;
pub use queue::{JobQueueRepository, JOB_NOTIFY_CHANNEL};
