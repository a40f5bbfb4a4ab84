use std::path::{Path, PathBuf};
use channel::CommandRequest;
use tracing::debug;
use crate::error::{OrchestratorError, Result};
use crate::menu;

/// Status queries sit outside the menu id range.
pub const GET_STATUS: u32 = 0;

/// Commands the orchestrator knows how to encode and whose replies it can read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Payload: one image path per line.
    LoadImageList { images: Vec<PathBuf> },
    RunMatching,
    ImportMatches { path: PathBuf },
    ReconstructSparse,
    ReconstructDense { output: PathBuf },
    ExportResults { path: PathBuf },
    GetStatus,
    Exit,
    /// Anything else, sent as-is.
    Opaque { opcode: u32, payload: Vec<u8> },
}

impl Command {
    pub fn opcode(&self) -> u32 {
        match self {
            Self::LoadImageList { .. } => menu::OPEN_MULTI_IMAGES,
            Self::RunMatching => menu::COMPUTE_MISSING_MATCH,
            Self::ImportMatches { .. } => menu::IMPORT_FEATURE_MATCHES,
            Self::ReconstructSparse => menu::RECONSTRUCT_SPARSE,
            Self::ReconstructDense { .. } => menu::RECONSTRUCT_DENSE,
            Self::ExportResults { .. } => menu::SAVE_NVIEW_MATCH,
            Self::GetStatus => GET_STATUS,
            Self::Exit => menu::EXIT_PROGRAM,
            Self::Opaque { opcode, .. } => *opcode,
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::LoadImageList { .. } => "load-image-list".into(),
            Self::RunMatching => "run-matching".into(),
            Self::ImportMatches { .. } => "import-matches".into(),
            Self::ReconstructSparse => "reconstruct-sparse".into(),
            Self::ReconstructDense { .. } => "reconstruct-dense".into(),
            Self::ExportResults { .. } => "export-results".into(),
            Self::GetStatus => "get-status".into(),
            Self::Exit => "exit".into(),
            Self::Opaque { opcode, .. } => match menu::path_of(*opcode) {
                Some(path) => path.into(),
                None => format!("opcode {opcode}"),
            },
        }
    }

    /// Whether the tool keeps working after acknowledging the command, so
    /// completion has to be polled for.
    pub fn is_long_running(&self) -> bool {
        matches!(
            self,
            Self::RunMatching
                | Self::ImportMatches { .. }
                | Self::ReconstructSparse
                | Self::ReconstructDense { .. }
        )
    }

    pub fn to_request(&self) -> Result<CommandRequest> {
        let payload = match self {
            Self::LoadImageList { images } => images
                .iter()
                .map(|p| utf8(p))
                .collect::<Result<Vec<_>>>()?
                .join("\n")
                .into_bytes(),
            Self::ImportMatches { path }
            | Self::ReconstructDense { output: path }
            | Self::ExportResults { path } => utf8(path)?.as_bytes().to_vec(),
            Self::RunMatching | Self::ReconstructSparse | Self::GetStatus | Self::Exit => vec![],
            Self::Opaque { payload, .. } => payload.clone(),
        };
        Ok(CommandRequest::new(self.opcode(), payload))
    }

    /// Interprets the payload of a successful response to this command.
    pub fn decode_reply(&self, payload: Vec<u8>) -> Result<Reply> {
        match self {
            Self::GetStatus => {
                let text = String::from_utf8(payload).map_err(|_| OrchestratorError::MalformedResponse {
                    command: self.name(),
                    reason: "status is not UTF-8".into(),
                })?;
                Ok(Reply::Status(OperationStatus::parse(&text)))
            }
            Self::Opaque { .. } => Ok(Reply::Opaque(payload)),
            _ => {
                if !payload.is_empty() {
                    debug!("Ignoring {} bytes acknowledging {}", payload.len(), self.name());
                }
                Ok(Reply::Ack)
            }
        }
    }
}

fn utf8(path: &Path) -> Result<&str> {
    path.to_str().ok_or_else(|| OrchestratorError::NonUtf8Path(path.to_path_buf()))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Ack,
    Status(OperationStatus),
    Opaque(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    Running(String),
    Done,
    Failed(String),
}

impl OperationStatus {
    const PROCESSED_FLAG: &'static str = "*command processed*";
    /// Words the tool prints when a step completes, anywhere in its output.
    const COMPLETE_WORDS: [&'static str; 2] = ["done", "finished"];

    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let lower = text.to_lowercase();
        if lower.starts_with("error") {
            let reason = text["error".len()..].trim_start_matches([':', ' ']);
            return Self::Failed(reason.to_string());
        }
        let complete = lower.contains(Self::PROCESSED_FLAG)
            || lower
                .split(|c: char| !c.is_alphanumeric())
                .any(|word| Self::COMPLETE_WORDS.contains(&word));
        if complete {
            return Self::Done;
        }
        Self::Running(text.to_string())
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running(_))
    }
}
