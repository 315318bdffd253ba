//! Docpreview Storage Library
//!
//! Storage gateway for the conversion pipeline: download the source document
//! from object storage into the job workspace, upload the generated PDF under
//! a fresh key. Backends: S3 (and S3-compatible providers) and local
//! filesystem for development and tests.

pub mod factory;
pub(crate) mod keys;
pub mod local;
pub mod s3;
pub mod traits;

pub use factory::create_storage;
pub use local::LocalStorage;
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
