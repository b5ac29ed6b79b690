use std::collections::VecDeque;

use crate::error::Result;
use crate::video::types::{Frame, VideoInfo};

/// Sequential supplier of decoded frames
pub trait FrameSource {
    /// Format metadata of the stream being read
    fn info(&self) -> &VideoInfo;

    /// Decode the next frame, or `None` at end of stream
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Label used in error messages
    fn name(&self) -> &str {
        "stream"
    }
}

/// Sequential consumer of frames to be encoded
pub trait FrameSink {
    /// Append one frame to the output stream
    fn write_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Flush and close the output stream
    ///
    /// Called exactly once after the last frame. Implementations must also
    /// release their resources when dropped without `finish`.
    fn finish(&mut self) -> Result<()>;
}

/// In-memory frame source, mostly useful in tests
pub struct MemorySource {
    info: VideoInfo,
    frames: VecDeque<Frame>,
}

impl MemorySource {
    pub fn new(info: VideoInfo, frames: Vec<Frame>) -> Self {
        Self {
            info,
            frames: frames.into(),
        }
    }
}

impl FrameSource for MemorySource {
    fn info(&self) -> &VideoInfo {
        &self.info
    }

    fn next_frame(&mut self) -> Result<Option<Frame>> {
        Ok(self.frames.pop_front())
    }
}

/// In-memory frame sink that keeps everything it is given
#[derive(Debug, Default)]
pub struct MemorySink {
    pub frames: Vec<Frame>,
    pub finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FrameSink for MemorySink {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}
