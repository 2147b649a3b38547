use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{CoreError, Result};

const DIR_PREFIX: &str = "slidecast-";

/// Exclusively owned scratch directory for one export.
///
/// Every file the pipeline creates lives under [`Workspace::path`]. The
/// directory is removed exactly once: by [`Workspace::destroy`] on the normal
/// path, or by `Drop` when the owner unwinds or returns early.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    released: bool,
}

impl Workspace {
    /// Create a fresh `slidecast-<uuid>` directory under `parent`.
    ///
    /// The leaf is created with `create_dir`, not `create_dir_all`, so a name
    /// collision fails instead of silently sharing a directory.
    pub fn create(parent: &Path) -> Result<Self> {
        let dir = parent.join(format!("{DIR_PREFIX}{}", Uuid::new_v4()));
        let create_failed = |source| CoreError::WorkspaceCreateFailed {
            path: dir.clone(),
            source,
        };

        std::fs::create_dir_all(parent).map_err(create_failed)?;
        std::fs::create_dir(&dir).map_err(create_failed)?;

        // The concat manifest needs absolute paths.
        let root = match std::fs::canonicalize(&dir) {
            Ok(root) => root,
            Err(source) => {
                let _ = remove_dir_if_present(&dir);
                return Err(create_failed(source));
            }
        };

        tracing::debug!(path = %root.display(), "workspace created");
        Ok(Self {
            root,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// `image_<index>.<ext>`
    pub fn image_path(&self, index: usize, extension: &str) -> PathBuf {
        self.root.join(format!("image_{index}.{extension}"))
    }

    /// `audio.<ext>`
    pub fn audio_path(&self, extension: &str) -> PathBuf {
        self.root.join(format!("audio.{extension}"))
    }

    /// `video_<index>.mp4`
    pub fn segment_path(&self, index: usize) -> PathBuf {
        self.root.join(format!("video_{index}.mp4"))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join("filelist.txt")
    }

    pub fn concat_path(&self) -> PathBuf {
        self.root.join("concat.mp4")
    }

    pub fn output_path(&self) -> PathBuf {
        self.root.join("output.mp4")
    }

    /// Remove the directory and everything in it. Never fails: a missing
    /// directory is fine and any other error is logged.
    pub fn destroy(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match remove_dir_if_present(&self.root) {
            Ok(()) => tracing::debug!(path = %self.root.display(), "workspace removed"),
            Err(e) => tracing::warn!(
                path = %self.root.display(),
                error = %e,
                "failed to remove workspace"
            ),
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.release();
    }
}

/// `remove_dir_all` that treats an already-missing directory as success.
pub fn remove_dir_if_present(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_dir_all(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
