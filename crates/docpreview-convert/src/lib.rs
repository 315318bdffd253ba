//! Docpreview Convert Library
//!
//! The conversion pipeline itself: per-job temp workspace, the headless
//! office subprocess wrapper for legacy inputs, the remote renderer protocol
//! client, and the orchestrator that drives one job from downloaded source to
//! reported status.

pub mod legacy;
pub mod orchestrator;
pub mod renderer;
pub mod workspace;

pub use legacy::LegacyConverter;
pub use orchestrator::PreviewOrchestrator;
pub use renderer::RendererClient;
pub use workspace::JobWorkspace;
