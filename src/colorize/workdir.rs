use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::Result;

/// Scratch directory for one colorization, removed on drop
#[derive(Debug)]
pub struct WorkingDir {
    path: PathBuf,
}

impl WorkingDir {
    /// Create `colorize_<stem>` next to `input`
    pub fn create_for(input: &Path) -> Result<Self> {
        let stem = file_stem(input);
        let parent = input
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        Self::create(parent.join(format!("colorize_{}", stem)))
    }

    pub fn create(path: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&path)?;
        debug!("Created working directory {:?}", path);
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for WorkingDir {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir_all(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Could not remove working directory {:?}: {}", self.path, e);
            }
        }
    }
}

/// File stem as UTF-8, lossily
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_workdir_next_to_input_and_removed() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("old_film.mp4");

        let path = {
            let workdir = WorkingDir::create_for(&input).unwrap();
            assert_eq!(workdir.path(), dir.path().join("colorize_old_film"));
            std::fs::create_dir_all(workdir.path().join("video/result")).unwrap();
            std::fs::write(workdir.path().join("video/result/x.mp4"), b"x").unwrap();
            workdir.path().to_path_buf()
        };

        assert!(!path.exists());
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem(Path::new("/a/b/clip.final.mp4")), "clip.final");
        assert_eq!(file_stem(Path::new("clip")), "clip");
    }
}
