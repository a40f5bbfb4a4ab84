mod channel;
mod config;
mod error;
pub mod frame;
mod transport;
mod worker;

pub use channel::{Channel, ChannelState};
pub use config::ChannelConfig;
pub use error::{ChannelError, Result};
pub use frame::{CommandRequest, CommandResponse, ResponseStatus};
pub use transport::Transport;
pub use worker::{spawn_worker, ChannelHandle};
