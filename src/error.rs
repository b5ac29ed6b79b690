use thiserror::Error;

/// Main error type for the video colorizer library
#[derive(Error, Debug)]
pub enum ColorizerError {
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("Video processing error: {0}")]
    Video(#[from] VideoError),

    #[error("Colorization error: {0}")]
    Colorization(#[from] ColorizationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Processing cancelled")]
    Cancelled,

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Malformed or unusable frame data
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Frame is empty ({width}x{height})")]
    Empty { width: u32, height: u32 },

    #[error("Frame dimensions differ: {expected_width}x{expected_height} vs {actual_width}x{actual_height}")]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("Frame buffer has {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },
}

/// Video-specific errors
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Failed to open video '{path}': {reason}")]
    OpenFailed { path: String, reason: String },

    #[error("Video decoding failed: {reason}")]
    DecodingFailed { reason: String },

    #[error("Failed to write video '{path}': {reason}")]
    WriteFailed { path: String, reason: String },

    #[error("FFmpeg not found. Please install FFmpeg and make sure it is on PATH.")]
    FfmpegMissing,
}

/// Errors raised by the upstream colorization step
#[derive(Error, Debug)]
pub enum ColorizationError {
    #[error("Failed to launch colorizer '{program}': {reason}")]
    LaunchFailed { program: String, reason: String },

    #[error("Colorizer failed for '{path}': {reason}")]
    Failed { path: String, reason: String },

    #[error("Colorization finished but the expected result was not found: {path}")]
    MissingResult { path: String },
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Convenience type alias for Results using ColorizerError
pub type Result<T> = std::result::Result<T, ColorizerError>;

impl ColorizerError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Video(VideoError::OpenFailed { path, .. }) => {
                format!(
                    "Could not open video '{}'. Please check the file exists and is a supported format.",
                    path
                )
            }
            Self::Video(VideoError::WriteFailed { path, reason }) => {
                format!(
                    "Could not write '{}' ({}). Check the output directory and free disk space.",
                    path, reason
                )
            }
            Self::Colorization(ColorizationError::LaunchFailed { program, .. }) => {
                format!(
                    "Could not start the colorization worker '{}'. Set [colorize].program in the configuration.",
                    program
                )
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_error_converts() {
        let err: ColorizerError = FrameError::Empty { width: 0, height: 4 }.into();
        assert!(matches!(err, ColorizerError::Frame(FrameError::Empty { .. })));
        assert!(err.to_string().contains("0x4"));
    }

    #[test]
    fn test_user_messages() {
        let open: ColorizerError = VideoError::OpenFailed {
            path: "a.mp4".into(),
            reason: "no video stream".into(),
        }
        .into();
        assert!(open.user_message().contains("'a.mp4'"));

        let write: ColorizerError = VideoError::WriteFailed {
            path: "b.mp4".into(),
            reason: "disk full".into(),
        }
        .into();
        assert!(write.user_message().contains("disk full"));

        let cancelled = ColorizerError::Cancelled;
        assert_eq!(cancelled.user_message(), "Processing cancelled");
    }
}
