use std::fmt;
use std::io;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info, warn};
use crate::config::ChannelConfig;
use crate::error::{ChannelError, Result};
use crate::frame::{self, CommandRequest, CommandResponse};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
    Sending,
    AwaitingResponse,
    Closed,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Sending => "sending",
            Self::AwaitingResponse => "awaiting response",
            Self::Closed => "closed",
        };
        f.write_str(label)
    }
}

/// A single persistent connection to the external process.
///
/// At most one request is outstanding at a time: `send` borrows the channel
/// mutably for the whole exchange. After a timeout or a lost connection the
/// channel is `Closed` for good, since unread bytes may still be in flight;
/// reconnecting means building a new channel.
pub struct Channel {
    config: ChannelConfig,
    state: ChannelState,
    stream: Option<TcpStream>,
}

impl Channel {
    pub fn new(config: ChannelConfig) -> Self {
        Self {
            config,
            state: ChannelState::Disconnected,
            stream: None,
        }
    }

    /// Creates a channel and connects it to the configured host and port.
    pub async fn open(config: ChannelConfig) -> Result<Self> {
        let host = config.host.clone();
        let port = config.port;
        let timeout = config.connect_timeout();
        let mut channel = Self::new(config);
        channel.connect(&host, port, timeout).await?;
        Ok(channel)
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    pub async fn connect(&mut self, host: &str, port: u16, timeout: Duration) -> Result<()> {
        self.expect_state(ChannelState::Disconnected)?;
        self.state = ChannelState::Connecting;

        let addr = format!("{host}:{port}");
        let attempts = self.config.connect_attempts.max(1);
        let mut last_err = None;

        for attempt in 1..=attempts {
            debug!("Connecting to {} (attempt {}/{})", addr, attempt, attempts);
            match tokio::time::timeout(timeout, TcpStream::connect(&addr)).await {
                Ok(Ok(stream)) => {
                    // Commands are tiny; don't let Nagle hold them back.
                    if let Err(err) = stream.set_nodelay(true) {
                        warn!("Could not disable Nagle on {}: {}", addr, err);
                    }
                    info!("Connected to external process at {}", addr);
                    self.stream = Some(stream);
                    self.state = ChannelState::Connected;
                    return Ok(());
                }
                Ok(Err(err)) => last_err = Some(err),
                Err(_) => {
                    last_err = Some(io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("connection attempt timed out after {timeout:?}"),
                    ))
                }
            }
            if attempt < attempts {
                tokio::time::sleep(self.config.retry_interval()).await;
            }
        }

        self.state = ChannelState::Disconnected;
        let source = last_err.unwrap_or_else(|| io::Error::other("no connection attempt made"));
        warn!("Could not connect to {}: {}", addr, source);
        Err(ChannelError::Connect { addr, source })
    }

    /// Sends one request and waits for its response.
    ///
    /// Failures other than `InvalidState` and `PayloadTooLarge` close the
    /// channel, and so does dropping the returned future before it resolves.
    pub async fn send(&mut self, request: &CommandRequest) -> Result<CommandResponse> {
        self.expect_state(ChannelState::Connected)?;
        let frame = request.to_frame()?;
        let stream = self.stream.take().ok_or_else(|| {
            ChannelError::ConnectionLost(io::Error::new(io::ErrorKind::NotConnected, "no socket"))
        })?;

        let timeout = self.config.request_timeout();
        let max_frame_len = self.config.max_frame_len;
        debug!(
            "Sending opcode {} with {} payload bytes",
            request.opcode(),
            request.payload().len()
        );

        let mut in_flight = InFlight {
            state: &mut self.state,
            stream: Some(stream),
        };
        let outcome = tokio::time::timeout(
            timeout,
            in_flight.exchange(&frame, request.opcode(), max_frame_len),
        )
        .await;

        match outcome {
            Ok(Ok(response)) => {
                self.stream = in_flight.finish();
                debug!("Opcode {} answered with {:?}", request.opcode(), response.status());
                Ok(response)
            }
            Ok(Err(err)) => {
                drop(in_flight);
                warn!("Opcode {} failed: {}", request.opcode(), err);
                self.close().await;
                Err(err)
            }
            Err(_) => {
                drop(in_flight);
                warn!("Opcode {} got no response within {:?}", request.opcode(), timeout);
                self.close().await;
                Err(ChannelError::Timeout(timeout))
            }
        }
    }

    /// Releases the socket. Safe to call in any state, any number of times.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(err) = stream.shutdown().await {
                debug!("Socket shutdown failed: {}", err);
            }
            info!("Channel closed");
        }
        self.state = ChannelState::Closed;
    }

    fn expect_state(&self, expected: ChannelState) -> Result<()> {
        if self.state != expected {
            return Err(ChannelError::InvalidState {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }
}

/// Owns the socket while a request is on the wire. Unless `finish` hands the
/// socket back, dropping this closes it and leaves the channel `Closed`.
struct InFlight<'a> {
    state: &'a mut ChannelState,
    stream: Option<TcpStream>,
}

impl InFlight<'_> {
    async fn exchange(&mut self, bytes: &[u8], opcode: u32, max_frame_len: u32) -> Result<CommandResponse> {
        let stream = self.stream.as_mut().ok_or_else(|| {
            ChannelError::ConnectionLost(io::Error::new(io::ErrorKind::NotConnected, "no socket"))
        })?;

        *self.state = ChannelState::Sending;
        frame::write_frame(stream, bytes).await?;

        *self.state = ChannelState::AwaitingResponse;
        let body = frame::read_frame(stream, max_frame_len).await?;
        Ok(CommandResponse::from_body(opcode, body))
    }

    fn finish(mut self) -> Option<TcpStream> {
        *self.state = ChannelState::Connected;
        self.stream.take()
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.stream.take().is_some() {
            debug!("Request abandoned mid-exchange, dropping socket");
            *self.state = ChannelState::Closed;
        }
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("host", &self.config.host)
            .field("port", &self.config.port)
            .field("state", &self.state)
            .finish()
    }
}
