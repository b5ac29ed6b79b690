use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::thread::JoinHandle;

use tracing::{debug, warn};

use crate::error::{Result, VideoError};
use crate::subprocess::{collect_stderr, join_stderr};
use crate::video::probe::probe_video;
use crate::video::stream::FrameSource;
use crate::video::types::{Frame, VideoInfo};

/// Sequential frame decoder backed by an `ffmpeg` child process
///
/// FFmpeg decodes the first video stream to raw `rgb24` on its stdout; frames
/// are read off the pipe one at a time. Rotated streams come out in display
/// orientation, matching the swapped size `probe_video` reports. The child is
/// killed and reaped when the reader is dropped before reaching the end of
/// the stream.
pub struct FrameReader {
    path: String,
    info: VideoInfo,
    child: Child,
    stdout: BufReader<ChildStdout>,
    stderr: Option<JoinHandle<String>>,
    frames_read: u64,
    finished: bool,
}

impl FrameReader {
    /// Probe `path` and start decoding it
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();
        let info = probe_video(path)?;

        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(path)
            .args([
                "-map", "0:v:0",
                "-f", "rawvideo",
                "-pix_fmt", "rgb24",
                "-vsync", "passthrough",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| VideoError::OpenFailed {
                path: path_str.clone(),
                reason: format!("failed to spawn ffmpeg: {}", e),
            })?;

        let stdout = child.stdout.take().ok_or_else(|| VideoError::OpenFailed {
            path: path_str.clone(),
            reason: "failed to open ffmpeg stdout".to_string(),
        })?;
        let stderr = child.stderr.take().map(collect_stderr);

        debug!("Decoding {} ({}x{} @ {})", path_str, info.width, info.height, info.frame_rate);

        Ok(Self {
            path: path_str,
            info,
            child,
            stdout: BufReader::new(stdout),
            stderr,
            frames_read: 0,
            finished: false,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }

    /// Reap the child once the pipe is exhausted and surface its exit status
    fn close(&mut self) -> Result<()> {
        self.finished = true;
        let status = self.child.wait().map_err(|e| VideoError::DecodingFailed {
            reason: format!("failed to wait for ffmpeg: {}", e),
        })?;
        let stderr = join_stderr(self.stderr.take());

        if !status.success() {
            return Err(VideoError::DecodingFailed {
                reason: format!("ffmpeg exited with {}: {}", status, stderr.trim()),
            }
            .into());
        }
        if !stderr.trim().is_empty() {
            warn!("ffmpeg reported while decoding {}: {}", self.path, stderr.trim());
        }
        Ok(())
    }
}

impl FrameSource for FrameReader {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn name(&self) -> &str {
        &self.path
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.finished {
            return Ok(None);
        }

        let mut data = vec![0u8; self.info.frame_size()];
        match read_full(&mut self.stdout, &mut data) {
            Ok(0) => {
                self.close()?;
                Ok(None)
            }
            Ok(n) if n == data.len() => {
                self.frames_read += 1;
                Frame::from_rgb_bytes(self.info.width, self.info.height, data).map(Some)
            }
            Ok(n) => {
                let _ = self.close();
                Err(VideoError::DecodingFailed {
                    reason: format!(
                        "truncated frame {} in {}: got {} of {} bytes",
                        self.frames_read,
                        self.path,
                        n,
                        data.len()
                    ),
                }
                .into())
            }
            Err(e) => Err(VideoError::DecodingFailed {
                reason: format!("failed to read from ffmpeg: {}", e),
            }
            .into()),
        }
    }
}

impl Drop for FrameReader {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

/// Fill `buf` as far as possible, returning the number of bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
