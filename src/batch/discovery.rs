use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::colorize::workdir::file_stem;
use crate::error::{ConfigError, Result};

/// Where the batch takes its videos from
#[derive(Debug, Clone, PartialEq)]
pub enum InputSpec {
    /// Explicit files, processed in the given order
    Files(Vec<PathBuf>),
    /// Every `.mp4` in a directory, sorted by path
    Directory { path: PathBuf, recursive: bool },
}

/// Resolve `source` into the list of candidate input videos
pub fn discover_inputs(source: &InputSpec) -> Result<Vec<PathBuf>> {
    match source {
        InputSpec::Files(files) => Ok(files.clone()),
        InputSpec::Directory { path, recursive } => {
            if !path.is_dir() {
                return Err(ConfigError::InvalidValue {
                    key: "input_dir".to_string(),
                    value: path.display().to_string(),
                }
                .into());
            }

            let max_depth = if *recursive { usize::MAX } else { 1 };
            let mut files: Vec<PathBuf> = WalkDir::new(path)
                .max_depth(max_depth)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| is_mp4(p))
                .collect();
            files.sort();
            Ok(files)
        }
    }
}

fn is_mp4(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("mp4"))
        .unwrap_or(false)
}

/// Whether `path` looks like something this tool wrote (`*_color.mp4`, `*_final.mp4`)
pub fn is_previous_output(path: &Path) -> bool {
    path.file_name()
        .map(|name| {
            let name = name.to_string_lossy();
            name.ends_with("_color.mp4") || name.ends_with("_final.mp4")
        })
        .unwrap_or(false)
}

/// Output locations derived from one input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    /// Raw colorizer result, `<out>/<stem>_color.mp4`
    pub color: PathBuf,
    /// Post-processed video, `<out>/<stem>_final.mp4`
    pub final_video: PathBuf,
}

impl OutputPaths {
    pub fn for_input(input: &Path, output_dir: &Path) -> Self {
        let stem = file_stem(input);
        Self {
            color: output_dir.join(format!("{}_color.mp4", stem)),
            final_video: output_dir.join(format!("{}_final.mp4", stem)),
        }
    }

    pub fn all_exist(&self) -> bool {
        self.color.is_file() && self.final_video.is_file()
    }
}
