use std::time::Duration;
use burn::prelude::Config;

#[derive(Config, Debug)]
pub struct ChannelConfig {
    /// Port the external process listens on.
    pub port: u16,

    /// Host the external process listens on.
    #[config(default = "String::from(\"127.0.0.1\")")]
    pub host: String,

    /// Time allowed for a single connection attempt.
    #[config(default = 5000)]
    pub connect_timeout_ms: u64,

    /// Connection attempts before giving up. A freshly launched tool may not
    /// be listening yet, so launchers usually raise this.
    #[config(default = 1)]
    pub connect_attempts: u32,

    /// Pause between connection attempts.
    #[config(default = 100)]
    pub retry_interval_ms: u64,

    /// Time allowed for one request to be written and its response read.
    #[config(default = 60000)]
    pub request_timeout_ms: u64,

    /// Largest response frame accepted, in bytes.
    #[config(default = 16777216)]
    pub max_frame_len: u32,
}

impl ChannelConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
