//! Error types shared across framesieve crates.

use std::path::PathBuf;

/// Top-level error type for framesieve operations.
#[derive(Debug, thiserror::Error)]
pub enum FramesieveError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Extraction error: {message}")]
    Extraction { message: String },

    #[error("Tool not found: {tool} ({path})")]
    ToolNotFound { tool: String, path: PathBuf },

    #[error("{tool} timed out after {secs}s")]
    ToolTimeout { tool: String, secs: u64 },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result type alias using FramesieveError.
pub type FramesieveResult<T> = Result<T, FramesieveError>;

impl FramesieveError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction {
            message: msg.into(),
        }
    }

    pub fn tool_not_found(tool: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::ToolNotFound {
            tool: tool.into(),
            path: path.into(),
        }
    }

    pub fn tool_timeout(tool: impl Into<String>, secs: u64) -> Self {
        Self::ToolTimeout {
            tool: tool.into(),
            secs,
        }
    }

    /// Whether this error stems from bad user input rather than a runtime fault.
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Config { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_usage_errors() {
        assert!(FramesieveError::config("bad rate").is_usage());
        assert!(!FramesieveError::extraction("ffmpeg died").is_usage());
        assert!(!FramesieveError::Cancelled.is_usage());
    }

    #[test]
    fn test_display_includes_tool_and_path() {
        let err = FramesieveError::tool_not_found("detect-blurry", "./detect-blurry");
        let text = err.to_string();
        assert!(text.contains("detect-blurry"));
        assert!(text.contains("./detect-blurry"));
    }
}
