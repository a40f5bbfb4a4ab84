use std::io;
use std::time::Duration;
use thiserror::Error;
use crate::channel::ChannelState;

pub type Result<T> = std::result::Result<T, ChannelError>;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("No response within {0:?}")]
    Timeout(Duration),

    #[error("Connection to external process lost: {0}")]
    ConnectionLost(#[source] io::Error),

    #[error("Channel is {actual}, operation needs {expected}")]
    InvalidState {
        expected: ChannelState,
        actual: ChannelState,
    },

    #[error("Response frame of {0} bytes exceeds the frame limit")]
    FrameTooLarge(u32),

    #[error("Request body of {0} bytes does not fit a frame")]
    PayloadTooLarge(usize),

    #[error("Channel worker has stopped")]
    WorkerStopped,
}
