use async_trait::async_trait;
use crate::channel::Channel;
use crate::error::Result;
use crate::frame::{CommandRequest, CommandResponse};

/// Something that carries one command at a time to the external process.
#[async_trait]
pub trait Transport: Send {
    async fn send(&mut self, request: &CommandRequest) -> Result<CommandResponse>;

    async fn close(&mut self);
}

#[async_trait]
impl Transport for Channel {
    async fn send(&mut self, request: &CommandRequest) -> Result<CommandResponse> {
        Channel::send(self, request).await
    }

    async fn close(&mut self) {
        Channel::close(self).await
    }
}
