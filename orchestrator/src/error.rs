use std::path::PathBuf;
use std::time::Duration;
use channel::ChannelError;
use features::FeatureError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// The tool answered with an explicit failure. The diagnostic is passed
    /// through as the tool sent it.
    #[error("{command} failed in external tool: {}", String::from_utf8_lossy(.diagnostic))]
    ExternalTool { command: String, diagnostic: Vec<u8> },

    #[error("Malformed response to {command}: {reason}")]
    MalformedResponse { command: String, reason: String },

    #[error("{operation} did not finish within {deadline:?}")]
    OperationTimeout { operation: String, deadline: Duration },

    #[error("Feature file error: {0}")]
    Features(#[from] FeatureError),

    #[error("Unknown menu command: {0}")]
    UnknownMenuCommand(String),

    #[error("No images to load")]
    EmptyImageList,

    #[error("Not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Could not list image directory: {0}")]
    ImageScan(#[from] walkdir::Error),

    #[error("Path is not valid UTF-8: {}", .0.display())]
    NonUtf8Path(PathBuf),
}
