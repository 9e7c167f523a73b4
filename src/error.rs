//! Error types for transforge.

use std::path::PathBuf;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, ConvertError>;

/// Errors that can occur while orchestrating a conversion job.
///
/// Every variant is surfaced to callers as a failed [`crate::job::JobResult`];
/// nothing here crosses the service boundary as a panic.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// A required path or option was missing or empty. Rejected before any
    /// process is spawned.
    #[error("invalid request: {0}")]
    Validation(String),

    /// The encoder binary could not be spawned (not found, not executable).
    #[error("failed to spawn encoder: {message}")]
    Spawn { message: String },

    /// The encoder exited with a nonzero status. The full captured stderr
    /// transcript is preserved for diagnosis.
    #[error("encoder exited with status {}: {stderr}", exit_code.map(|c| c.to_string()).unwrap_or_else(|| "unknown".into()))]
    Process {
        exit_code: Option<i32>,
        stderr: String,
    },

    /// The encoder reported success but the output file cannot be stat'ed.
    #[error("output file missing after encode: {}", path.display())]
    OutputMissing { path: PathBuf },

    /// The job exceeded its configured timeout and was terminated.
    #[error("job timed out after {secs} seconds")]
    Timeout { secs: u64 },

    /// The job was cancelled by an explicit request.
    #[error("job cancelled")]
    Cancelled,

    /// Failed to parse the encoder's diagnostic output.
    #[error("failed to parse encoder output: {0}")]
    Parse(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a spawn error.
    pub fn spawn(message: impl Into<String>) -> Self {
        Self::Spawn {
            message: message.into(),
        }
    }

    /// Create a process-failure error carrying the exit code and transcript.
    pub fn process(exit_code: Option<i32>, stderr: impl Into<String>) -> Self {
        Self::Process {
            exit_code,
            stderr: stderr.into(),
        }
    }

    /// Create an output-missing error.
    pub fn output_missing(path: impl Into<PathBuf>) -> Self {
        Self::OutputMissing { path: path.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_error_preserves_stderr() {
        let err = ConvertError::process(Some(1), "Unknown encoder 'libfoo'");
        let msg = err.to_string();
        assert!(msg.contains("status 1"));
        assert!(msg.contains("Unknown encoder 'libfoo'"));
    }

    #[test]
    fn test_output_missing_shows_path() {
        let err = ConvertError::output_missing("/tmp/out.mp4");
        assert!(err.to_string().contains("/tmp/out.mp4"));
    }
}
