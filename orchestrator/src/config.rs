use std::time::Duration;
use burn::prelude::Config;
use features::CodecConfig;

#[derive(Config, Debug)]
pub struct OrchestratorConfig {
    /// Pause between status checks while a long operation runs.
    #[config(default = 500)]
    pub poll_interval_ms: u64,

    /// Longest a single long operation (matching, reconstruction) may take.
    #[config(default = 600000)]
    pub operation_deadline_ms: u64,

    /// Layout of the feature files handed to the external tool.
    #[config(default = "CodecConfig::vsfm()")]
    pub codec: CodecConfig,

    /// Extension of feature files stored next to their images.
    #[config(default = "String::from(\"sift\")")]
    pub feature_extension: String,
}

impl OrchestratorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn operation_deadline(&self) -> Duration {
        Duration::from_millis(self.operation_deadline_ms)
    }
}
