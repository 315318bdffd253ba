//! Per-job temp workspace.
//!
//! Every job gets a private directory that owns all of its intermediate files
//! (downloaded source, converted docx, office profile, output PDF). The
//! directory is removed recursively when the workspace is dropped, which
//! covers success, expected failures, and panics alike. Never reused across
//! jobs or retries.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use uuid::Uuid;

pub struct JobWorkspace {
    dir: TempDir,
}

impl JobWorkspace {
    /// Create a fresh empty workspace under the system temp directory.
    pub fn create() -> io::Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("docpreview-{}-", Uuid::new_v4()))
            .tempdir()?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Create a uuid-keyed private subdirectory inside the workspace.
    ///
    /// Used for the per-invocation office profile: the headless office suite
    /// keeps lock state keyed by its profile directory, so two concurrent
    /// conversions must never share one.
    pub fn unique_dir(&self, prefix: &str) -> io::Result<PathBuf> {
        let path = self
            .dir
            .path()
            .join(format!("{}-{}", prefix, Uuid::new_v4()));
        std::fs::create_dir_all(&path)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn workspace_is_removed_on_drop() {
        let workspace = JobWorkspace::create().unwrap();
        let path = workspace.path().to_path_buf();
        std::fs::write(path.join("input.doc"), b"data").unwrap();
        assert!(path.exists());

        drop(workspace);
        assert!(!path.exists());
    }

    #[test]
    fn unique_dirs_never_collide() {
        let workspace = JobWorkspace::create().unwrap();
        let dirs: HashSet<PathBuf> = (0..32)
            .map(|_| workspace.unique_dir("profile").unwrap())
            .collect();
        assert_eq!(dirs.len(), 32);
        for dir in &dirs {
            assert!(dir.is_dir());
            assert!(dir.starts_with(workspace.path()));
        }
    }

    #[test]
    fn separate_workspaces_have_separate_paths() {
        let a = JobWorkspace::create().unwrap();
        let b = JobWorkspace::create().unwrap();
        assert_ne!(a.path(), b.path());
    }
}
