use std::path::PathBuf;
use anyhow::anyhow;
use burn::prelude::Config;
use channel::ChannelConfig;
use clap::Parser;
use futures::StreamExt;
use orchestrator::{collect_images, Orchestrator, OrchestratorConfig, ReconstructionJob};
use tracing::info;

/// Drives a running SfM tool through a full reconstruction of an image folder.
#[derive(Parser)]
struct Args {
    /// Directory containing the input images
    #[arg(short, long)]
    images: PathBuf,

    /// Port the tool listens on
    #[arg(short, long)]
    port: u16,

    /// Host the tool runs on
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Where to write the dense reconstruction, if one is wanted
    #[arg(short, long)]
    dense: Option<PathBuf>,

    /// Where to save the n-view match / sparse model
    #[arg(short, long)]
    export: Option<PathBuf>,

    /// JSON file with orchestrator settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Connection attempts while the tool starts up
    #[arg(long, default_value_t = 1)]
    connect_attempts: u32,

    /// Ask the tool to quit once the job is done
    #[arg(long)]
    exit: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => OrchestratorConfig::load(path).map_err(|err| anyhow!("{err:?}"))?,
        None => OrchestratorConfig::new(),
    };
    let channel_config = ChannelConfig::new(args.port)
        .with_host(args.host.clone())
        .with_connect_attempts(args.connect_attempts);

    let images = collect_images(&args.images)?;
    info!("Found {} images in {}", images.len(), args.images.display());

    let mut job = ReconstructionJob::new(images);
    if let Some(dense) = args.dense {
        job = job.with_dense_output(dense);
    }
    if let Some(export) = args.export {
        job = job.with_export_path(export);
    }
    if args.exit {
        job = job.exit_when_done();
    }

    let mut orchestrator = Orchestrator::connect(channel_config, config).await?;
    let stream = orchestrator.run_job(job);
    let mut stream = std::pin::pin!(stream);

    while let Some(message) = stream.next().await {
        let message = message?;
        info!("{}", serde_json::to_string(&message)?);
    }

    Ok(())
}
