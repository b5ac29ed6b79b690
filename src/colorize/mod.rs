//! # Colorization
//!
//! The upstream step turning a black-and-white video into a colorized one.
//! The model itself lives outside this crate; a [`Colorizer`] only has to
//! produce a colorized file for an input path.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use tracing::{debug, warn};

use crate::error::Result;
use crate::progress::ProgressSink;

pub mod command;
pub mod workdir;

pub use command::CommandColorizer;
pub use workdir::WorkingDir;

/// Future returned by [`Colorizer::colorize`]
pub type ColorizeFuture<'a> = Pin<Box<dyn Future<Output = Result<ColorizedVideo>> + Send + 'a>>;

/// Upstream colorization collaborator
pub trait Colorizer: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Colorize `input`, reporting progress as the model advances
    fn colorize<'a>(
        &'a self,
        input: &'a Path,
        render_factor: u32,
        progress: &'a dyn ProgressSink,
    ) -> ColorizeFuture<'a>;
}

/// A colorized video, possibly still inside its scratch directory
#[derive(Debug)]
pub struct ColorizedVideo {
    path: PathBuf,
    workdir: Option<WorkingDir>,
}

impl ColorizedVideo {
    /// A result that owns the scratch directory it was written into
    pub fn in_workdir(path: PathBuf, workdir: WorkingDir) -> Self {
        Self {
            path,
            workdir: Some(workdir),
        }
    }

    /// A result that is a standalone file
    pub fn standalone(path: PathBuf) -> Self {
        Self { path, workdir: None }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move the result to `dest`, then release the scratch directory
    pub async fn persist(self, dest: &Path) -> Result<PathBuf> {
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        if tokio::fs::rename(&self.path, dest).await.is_err() {
            // Different filesystem
            debug!("Rename failed, copying {:?} to {:?}", self.path, dest);
            tokio::fs::copy(&self.path, dest).await?;
            if let Err(e) = tokio::fs::remove_file(&self.path).await {
                warn!("Could not remove {:?}: {}", self.path, e);
            }
        }

        Ok(dest.to_path_buf())
    }
}
