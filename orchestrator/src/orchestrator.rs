use std::path::{Path, PathBuf};
use channel::{Channel, ChannelConfig, ResponseStatus, Transport};
use features::matches::{write_matches_file, ImagePairMatches};
use features::{read_feature_file, write_feature_file, FeatureSet};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use crate::command::{Command, OperationStatus, Reply};
use crate::config::OrchestratorConfig;
use crate::error::{OrchestratorError, Result};
use crate::images::collect_images;
use crate::menu;

/// Runs domain operations against the external tool, one command at a time.
///
/// Every operation stops at the first failing command and reports it. Nothing
/// is retried: commands change the tool's state, so retrying is left to the
/// caller.
pub struct Orchestrator<T: Transport> {
    pub(crate) transport: T,
    pub(crate) config: OrchestratorConfig,
}

impl<T: Transport> Orchestrator<T> {
    pub fn new(transport: T, config: OrchestratorConfig) -> Self {
        Self { transport, config }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Sends one command and interprets its response.
    pub async fn execute(&mut self, command: &Command) -> Result<Reply> {
        let request = command.to_request()?;
        debug!("Executing {} (opcode {})", command.name(), request.opcode());
        let response = self.transport.send(&request).await?;

        match response.status() {
            ResponseStatus::Success => command.decode_reply(response.into_payload()),
            ResponseStatus::Failure => Err(OrchestratorError::ExternalTool {
                command: command.name(),
                diagnostic: response.into_payload(),
            }),
            ResponseStatus::Malformed => Err(OrchestratorError::MalformedResponse {
                command: command.name(),
                reason: format!("unreadable {}-byte response", response.payload().len()),
            }),
        }
    }

    /// Executes a command and, for long-running ones, waits until the tool
    /// reports it finished.
    pub async fn run(&mut self, command: &Command) -> Result<Reply> {
        let reply = self.execute(command).await?;
        if command.is_long_running() {
            self.wait_for_completion(&command.name()).await?;
        }
        Ok(reply)
    }

    pub async fn load_image_list(&mut self, images: &[PathBuf]) -> Result<()> {
        if images.is_empty() {
            return Err(OrchestratorError::EmptyImageList);
        }
        info!("Loading {} images", images.len());
        self.run(&Command::LoadImageList { images: images.to_vec() }).await?;
        Ok(())
    }

    pub async fn load_image_dir(&mut self, dir: &Path) -> Result<Vec<PathBuf>> {
        let images = collect_images(dir)?;
        info!("{} images found in {}", images.len(), dir.display());
        self.load_image_list(&images).await?;
        Ok(images)
    }

    pub async fn run_matching(&mut self) -> Result<()> {
        info!("Computing missing matches");
        self.run(&Command::RunMatching).await?;
        Ok(())
    }

    pub async fn get_status(&mut self) -> Result<OperationStatus> {
        match self.execute(&Command::GetStatus).await? {
            Reply::Status(status) => Ok(status),
            other => Err(OrchestratorError::MalformedResponse {
                command: Command::GetStatus.name(),
                reason: format!("expected a status, got {other:?}"),
            }),
        }
    }

    /// Polls the tool's status until it reports a terminal state.
    ///
    /// Polls at most `deadline / interval + 1` times and never past the
    /// deadline.
    pub async fn wait_for_completion(&mut self, operation: &str) -> Result<()> {
        let interval = self.config.poll_interval();
        let deadline = self.config.operation_deadline();
        let max_polls = deadline.as_millis() / interval.as_millis().max(1) + 1;
        let started = Instant::now();

        for poll in 1..=max_polls {
            match self.get_status().await? {
                OperationStatus::Done => {
                    info!("{} finished after {:?}", operation, started.elapsed());
                    return Ok(());
                }
                OperationStatus::Failed(reason) => {
                    return Err(OrchestratorError::ExternalTool {
                        command: operation.to_string(),
                        diagnostic: reason.into_bytes(),
                    });
                }
                OperationStatus::Running(progress) => {
                    debug!("{} still running (poll {}): {}", operation, poll, progress);
                }
            }
            if started.elapsed() + interval > deadline {
                break;
            }
            tokio::time::sleep(interval).await;
        }

        warn!("{} exceeded its deadline of {:?}", operation, deadline);
        Err(OrchestratorError::OperationTimeout {
            operation: operation.to_string(),
            deadline,
        })
    }

    pub async fn reconstruct_sparse(&mut self) -> Result<()> {
        info!("Running sparse reconstruction");
        self.run(&Command::ReconstructSparse).await?;
        Ok(())
    }

    pub async fn reconstruct_dense(&mut self, output: &Path) -> Result<()> {
        info!("Running dense reconstruction into {}", output.display());
        self.run(&Command::ReconstructDense { output: output.to_path_buf() }).await?;
        Ok(())
    }

    pub async fn export_results(&mut self, path: &Path) -> Result<()> {
        info!("Exporting reconstruction to {}", path.display());
        self.run(&Command::ExportResults { path: path.to_path_buf() }).await?;
        Ok(())
    }

    /// Writes the match list where the tool can read it, then imports it.
    pub async fn import_matches(&mut self, path: &Path, pairs: &[ImagePairMatches]) -> Result<()> {
        write_matches_file(path, pairs).await?;
        self.run(&Command::ImportMatches { path: path.to_path_buf() }).await?;
        Ok(())
    }

    /// Where the tool looks for an image's features.
    pub fn feature_path(&self, image: &Path) -> PathBuf {
        image.with_extension(&self.config.feature_extension)
    }

    /// Stores features next to their image. The tool picks them up when the
    /// image is loaded, so this must happen before `load_image_list`.
    pub async fn push_features(&self, image: &Path, features: &FeatureSet) -> Result<PathBuf> {
        let path = self.feature_path(image);
        write_feature_file(&path, features, &self.config.codec).await?;
        Ok(path)
    }

    pub async fn pull_features(&self, image: &Path) -> Result<FeatureSet> {
        Ok(read_feature_file(&self.feature_path(image), &self.config.codec).await?)
    }

    /// Sends any menu command by path, e.g. `"sfm/more/bundle_adjustment"`.
    pub async fn send_menu_command(&mut self, path: &str, param: Option<&str>) -> Result<Reply> {
        let opcode = menu::lookup(path).ok_or_else(|| OrchestratorError::UnknownMenuCommand(path.to_string()))?;
        let payload = param.map(|p| p.as_bytes().to_vec()).unwrap_or_default();
        self.execute(&Command::Opaque { opcode, payload }).await
    }

    /// Asks the tool to quit and closes the connection either way.
    pub async fn exit(&mut self) -> Result<()> {
        let result = self.execute(&Command::Exit).await;
        self.transport.close().await;
        result.map(|_| ())
    }

    pub async fn close(&mut self) {
        self.transport.close().await;
    }
}

impl Orchestrator<Channel> {
    pub async fn connect(channel_config: ChannelConfig, config: OrchestratorConfig) -> Result<Self> {
        let channel = Channel::open(channel_config).await?;
        Ok(Self::new(channel, config))
    }

    /// Replaces the current connection with a fresh one. The tool's state is
    /// whatever it was left in; nothing is replayed.
    pub async fn reconnect(&mut self) -> Result<()> {
        self.transport.close().await;
        let channel = Channel::open(self.transport.config().clone()).await?;
        info!("Reconnected to external process");
        self.transport = channel;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::time::Duration;
    use async_trait::async_trait;
    use channel::{ChannelError, CommandRequest, CommandResponse};
    use features::Keypoint;
    use super::*;

    /// Answers requests from a script and remembers what was sent.
    struct ScriptedTool {
        script: VecDeque<(ResponseStatus, &'static [u8])>,
        sent: Vec<CommandRequest>,
        closed: bool,
    }

    impl ScriptedTool {
        fn new(script: &[(ResponseStatus, &'static [u8])]) -> Self {
            Self {
                script: script.iter().copied().collect(),
                sent: vec![],
                closed: false,
            }
        }

        fn opcodes(&self) -> Vec<u32> {
            self.sent.iter().map(CommandRequest::opcode).collect()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTool {
        async fn send(&mut self, request: &CommandRequest) -> channel::Result<CommandResponse> {
            self.sent.push(request.clone());
            match self.script.pop_front() {
                Some((status, payload)) => Ok(CommandResponse::new(request.opcode(), status, payload)),
                None => Err(ChannelError::Timeout(Duration::from_millis(1))),
            }
        }

        async fn close(&mut self) {
            self.closed = true;
        }
    }

    const OK: (ResponseStatus, &[u8]) = (ResponseStatus::Success, b"");
    const RUNNING: (ResponseStatus, &[u8]) = (ResponseStatus::Success, b"matching 4/10");
    const DONE: (ResponseStatus, &[u8]) = (ResponseStatus::Success, b"done");

    fn orchestrator(script: &[(ResponseStatus, &'static [u8])]) -> Orchestrator<ScriptedTool> {
        let config = OrchestratorConfig::new()
            .with_poll_interval_ms(100)
            .with_operation_deadline_ms(1000);
        Orchestrator::new(ScriptedTool::new(script), config)
    }

    #[tokio::test(start_paused = true)]
    async fn matching_polls_until_done() {
        let mut orch = orchestrator(&[OK, RUNNING, RUNNING, DONE]);
        orch.run_matching().await.unwrap();
        assert_eq!(
            orch.transport().opcodes(),
            vec![menu::COMPUTE_MISSING_MATCH, 0, 0, 0]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn polling_gives_up_at_deadline() {
        let script = vec![RUNNING; 64];
        let mut orch = orchestrator(&script);
        let started = Instant::now();
        let err = orch.reconstruct_sparse().await.unwrap_err();

        assert!(matches!(err, OrchestratorError::OperationTimeout { .. }));
        assert!(started.elapsed() <= Duration::from_millis(1000));
        // One command plus a bounded number of status checks.
        assert!(orch.transport().sent.len() <= 12);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_status_is_external_tool_error() {
        let mut orch = orchestrator(&[OK, (ResponseStatus::Success, b"error: no pairs")]);
        match orch.run_matching().await.unwrap_err() {
            OrchestratorError::ExternalTool { command, diagnostic } => {
                assert_eq!(command, "run-matching");
                assert_eq!(diagnostic, b"no pairs");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn failure_response_carries_raw_diagnostic() {
        let mut orch = orchestrator(&[(ResponseStatus::Failure, b"\x01bad path")]);
        let err = orch.export_results(Path::new("out.nvm")).await.unwrap_err();
        match err {
            OrchestratorError::ExternalTool { diagnostic, .. } => assert_eq!(diagnostic, b"\x01bad path"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_response_is_surfaced() {
        let mut orch = orchestrator(&[(ResponseStatus::Malformed, b"??")]);
        assert!(matches!(
            orch.get_status().await,
            Err(OrchestratorError::MalformedResponse { .. })
        ));
    }

    #[tokio::test]
    async fn channel_errors_pass_through_without_retry() {
        let mut orch = orchestrator(&[]);
        let err = orch.load_image_list(&[PathBuf::from("a.jpg")]).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Channel(ChannelError::Timeout(_))));
        assert_eq!(orch.transport().sent.len(), 1);
    }

    #[tokio::test]
    async fn empty_image_list_sends_nothing() {
        let mut orch = orchestrator(&[OK]);
        assert!(matches!(
            orch.load_image_list(&[]).await,
            Err(OrchestratorError::EmptyImageList)
        ));
        assert!(orch.transport().sent.is_empty());
    }

    #[tokio::test]
    async fn menu_commands_by_path() {
        let mut orch = orchestrator(&[(ResponseStatus::Success, b"3 models")]);
        let reply = orch.send_menu_command("sfm/extra/model_information", None).await.unwrap();
        assert_eq!(reply, Reply::Opaque(b"3 models".to_vec()));
        assert_eq!(orch.transport().opcodes(), vec![33225]);

        assert!(matches!(
            orch.send_menu_command("sfm/nonsense", Some("x")).await,
            Err(OrchestratorError::UnknownMenuCommand(_))
        ));
    }

    #[tokio::test]
    async fn exit_closes_transport_even_on_failure() {
        let mut orch = orchestrator(&[(ResponseStatus::Failure, b"busy")]);
        assert!(orch.exit().await.is_err());
        assert!(orch.transport().closed);
    }

    #[tokio::test]
    async fn features_are_pushed_next_to_images() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("img_01.jpg");
        let orch = orchestrator(&[]);

        let mut set = FeatureSet::new(128);
        set.push(Keypoint::new(4.0, 8.0, 1.5, 0.25), vec![9.0; 128]);
        let path = orch.push_features(&image, &set).await.unwrap();

        assert_eq!(path, dir.path().join("img_01.sift"));
        assert_eq!(orch.pull_features(&image).await.unwrap(), set);
    }
}
