use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, VideoError};
use crate::subprocess::{collect_stderr, join_stderr};
use crate::video::stream::FrameSink;
use crate::video::types::{Frame, VideoInfo};

/// Output encoding parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderParams {
    /// FFmpeg encoder name (e.g. "libx264")
    pub codec: String,

    /// Output pixel format passed to `-pix_fmt`
    pub pixel_format: String,

    /// Quality setting (0-100, higher is better); `None` keeps the encoder default
    pub quality: Option<u8>,
}

impl Default for EncoderParams {
    fn default() -> Self {
        Self {
            codec: "libx264".to_string(),
            pixel_format: "yuv420p".to_string(),
            quality: None,
        }
    }
}

impl EncoderParams {
    /// Map the 0-100 quality scale onto x264/x265 CRF (0-51, lower is better)
    pub fn crf(&self) -> Option<u8> {
        self.quality
            .map(|quality| (51 - ((quality.min(100) as f32 / 100.0) * 51.0) as u8).clamp(0, 51))
    }

    /// Chroma subsampling of the output format as (horizontal, vertical) divisors
    fn chroma_subsampling(&self) -> (u32, u32) {
        let format = self.pixel_format.as_str();
        if format.contains("420") || format.starts_with("nv12") || format.starts_with("nv21") {
            (2, 2)
        } else if format.contains("422") {
            (2, 1)
        } else if format.contains("411") {
            (4, 1)
        } else {
            (1, 1)
        }
    }

    /// Fail early when the frame size cannot be stored in the output pixel format
    ///
    /// Subsampled formats such as `yuv420p` need even dimensions; the encoder
    /// would otherwise die on the first frame with a broken pipe.
    pub fn check_dimensions(&self, info: &VideoInfo, output: &Path) -> Result<()> {
        let (x_div, y_div) = self.chroma_subsampling();
        if info.width % x_div != 0 || info.height % y_div != 0 {
            return Err(VideoError::WriteFailed {
                path: output.display().to_string(),
                reason: format!(
                    "{}x{} frames cannot be encoded as {}; set output.encoder.pixel_format to \"yuv444p\"",
                    info.width, info.height, self.pixel_format
                ),
            }
            .into());
        }
        Ok(())
    }

    /// Build the FFmpeg argument list for a raw rgb24 stdin stream
    pub fn ffmpeg_args(&self, info: &VideoInfo, output: &Path) -> Vec<String> {
        let mut args: Vec<String> = vec![
            "-y".into(),
            "-v".into(),
            "error".into(),
            "-f".into(),
            "rawvideo".into(),
            "-pixel_format".into(),
            "rgb24".into(),
            "-video_size".into(),
            format!("{}x{}", info.width, info.height),
            "-framerate".into(),
            info.frame_rate.to_string(),
            "-i".into(),
            "pipe:0".into(),
            "-c:v".into(),
            self.codec.clone(),
        ];

        if let Some(crf) = self.crf() {
            args.extend_from_slice(&["-crf".into(), crf.to_string()]);
        }

        args.extend_from_slice(&["-pix_fmt".into(), self.pixel_format.clone()]);
        args.push(output.to_string_lossy().into_owned());
        args
    }
}

/// Sequential frame encoder backed by an `ffmpeg` child process
///
/// Frames are piped to FFmpeg's stdin as raw `rgb24`. `finish` closes the pipe
/// and waits for the encoder; dropping an unfinished writer kills the child.
pub struct FrameWriter {
    path: PathBuf,
    info: VideoInfo,
    child: Child,
    stdin: Option<BufWriter<ChildStdin>>,
    stderr: Option<JoinHandle<String>>,
    frames_written: u64,
    finished: bool,
}

impl FrameWriter {
    /// Start an encoder writing `info.width` x `info.height` frames at `info.frame_rate`
    pub fn create<P: AsRef<Path>>(
        path: P,
        info: &VideoInfo,
        params: &EncoderParams,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        params.check_dimensions(info, &path)?;
        let args = params.ffmpeg_args(info, &path);

        debug!("Encoding {} with ffmpeg {}", path.display(), args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| VideoError::WriteFailed {
                path: path.display().to_string(),
                reason: format!("failed to spawn ffmpeg: {}", e),
            })?;

        let stdin = child.stdin.take().ok_or_else(|| VideoError::WriteFailed {
            path: path.display().to_string(),
            reason: "failed to open ffmpeg stdin".to_string(),
        })?;
        let stderr = child.stderr.take().map(collect_stderr);

        Ok(Self {
            path,
            info: info.clone(),
            child,
            stdin: Some(BufWriter::new(stdin)),
            stderr,
            frames_written: 0,
            finished: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    fn write_failed(&mut self, reason: String) -> crate::error::ColorizerError {
        // The encoder usually explains a broken pipe on stderr.
        self.stdin = None;
        let _ = self.child.kill();
        let _ = self.child.wait();
        self.finished = true;
        let stderr = join_stderr(self.stderr.take());
        let reason = if stderr.trim().is_empty() {
            reason
        } else {
            format!("{} ({})", reason, stderr.trim())
        };
        VideoError::WriteFailed {
            path: self.path.display().to_string(),
            reason,
        }
        .into()
    }
}

impl FrameSink for FrameWriter {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if frame.width() != self.info.width || frame.height() != self.info.height {
            return Err(crate::error::FrameError::DimensionMismatch {
                expected_width: self.info.width,
                expected_height: self.info.height,
                actual_width: frame.width(),
                actual_height: frame.height(),
            }
            .into());
        }

        let result = match self.stdin.as_mut() {
            Some(stdin) => stdin.write_all(frame.as_raw()),
            None => {
                return Err(VideoError::WriteFailed {
                    path: self.path.display().to_string(),
                    reason: "encoder already finished".to_string(),
                }
                .into())
            }
        };

        match result {
            Ok(()) => {
                self.frames_written += 1;
                Ok(())
            }
            Err(e) => Err(self.write_failed(format!("failed to write frame: {}", e))),
        }
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }

        if let Some(mut stdin) = self.stdin.take() {
            if let Err(e) = stdin.flush() {
                return Err(self.write_failed(format!("failed to flush frames: {}", e)));
            }
            // Dropping stdin signals end-of-stream
        }

        let status = self.child.wait().map_err(|e| VideoError::WriteFailed {
            path: self.path.display().to_string(),
            reason: format!("failed to wait for ffmpeg: {}", e),
        })?;
        self.finished = true;

        let stderr = join_stderr(self.stderr.take());

        if !status.success() {
            return Err(VideoError::WriteFailed {
                path: self.path.display().to_string(),
                reason: format!("ffmpeg exited with {}: {}", status, stderr.trim()),
            }
            .into());
        }

        debug!("Finalized {} ({} frames)", self.path.display(), self.frames_written);
        Ok(())
    }
}

impl Drop for FrameWriter {
    fn drop(&mut self) {
        if !self.finished {
            self.stdin = None;
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}
