use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;
use crate::channel::Channel;
use crate::error::{ChannelError, Result};
use crate::frame::{CommandRequest, CommandResponse};
use crate::transport::Transport;

const QUEUE_DEPTH: usize = 32;

enum Job {
    Send {
        request: CommandRequest,
        reply: oneshot::Sender<Result<CommandResponse>>,
    },
    Close {
        done: oneshot::Sender<()>,
    },
}

/// Cloneable access to a channel owned by a dedicated task.
///
/// Requests from all clones are queued and sent one after another.
#[derive(Clone, Debug)]
pub struct ChannelHandle {
    jobs: mpsc::Sender<Job>,
}

/// Moves the channel onto its own task. The channel is closed once every
/// handle is dropped or [`ChannelHandle::shutdown`] is called.
pub fn spawn_worker(channel: Channel) -> ChannelHandle {
    let (jobs, rx) = mpsc::channel(QUEUE_DEPTH);
    tokio::spawn(run(channel, rx));
    ChannelHandle { jobs }
}

async fn run(mut channel: Channel, mut jobs: mpsc::Receiver<Job>) {
    while let Some(job) = jobs.recv().await {
        match job {
            Job::Send { request, reply } => {
                let result = channel.send(&request).await;
                // The caller may have given up waiting.
                let _ = reply.send(result);
            }
            Job::Close { done } => {
                channel.close().await;
                let _ = done.send(());
                break;
            }
        }
    }
    channel.close().await;
    debug!("Channel worker finished");
}

impl ChannelHandle {
    pub async fn submit(&self, request: CommandRequest) -> Result<CommandResponse> {
        let (reply, response) = oneshot::channel();
        self.jobs
            .send(Job::Send { request, reply })
            .await
            .map_err(|_| ChannelError::WorkerStopped)?;
        response.await.map_err(|_| ChannelError::WorkerStopped)?
    }

    pub async fn shutdown(&self) {
        let (done, finished) = oneshot::channel();
        if self.jobs.send(Job::Close { done }).await.is_ok() {
            let _ = finished.await;
        }
    }
}

#[async_trait]
impl Transport for ChannelHandle {
    async fn send(&mut self, request: &CommandRequest) -> Result<CommandResponse> {
        self.submit(request.clone()).await
    }

    async fn close(&mut self) {
        self.shutdown().await
    }
}
