use std::path::PathBuf;
use async_fn_stream::{try_fn_stream, TryStreamEmitter};
use channel::Transport;
use features::matches::ImagePairMatches;
use features::FeatureSet;
use futures::Stream;
use serde::Serialize;
use tracing::info;
use crate::error::OrchestratorError;
use crate::orchestrator::Orchestrator;

/// A complete reconstruction run over a set of images.
#[derive(Debug, Clone, Default)]
pub struct ReconstructionJob {
    pub images: Vec<PathBuf>,
    /// Features written next to their images before loading.
    pub features: Vec<(PathBuf, FeatureSet)>,
    /// Putative matches imported before the tool computes the missing ones.
    pub matches: Option<(PathBuf, Vec<ImagePairMatches>)>,
    pub dense_output: Option<PathBuf>,
    pub export_path: Option<PathBuf>,
    pub exit_when_done: bool,
}

impl ReconstructionJob {
    pub fn new(images: Vec<PathBuf>) -> Self {
        Self { images, ..Default::default() }
    }

    pub fn with_features(mut self, image: PathBuf, features: FeatureSet) -> Self {
        self.features.push((image, features));
        self
    }

    pub fn with_matches(mut self, path: PathBuf, pairs: Vec<ImagePairMatches>) -> Self {
        self.matches = Some((path, pairs));
        self
    }

    pub fn with_dense_output(mut self, output: PathBuf) -> Self {
        self.dense_output = Some(output);
        self
    }

    pub fn with_export_path(mut self, path: PathBuf) -> Self {
        self.export_path = Some(path);
        self
    }

    pub fn exit_when_done(mut self) -> Self {
        self.exit_when_done = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum WorkflowMessage {
    FeaturesWritten { path: PathBuf },
    ImagesLoaded { count: usize },
    MatchesImported { pairs: usize },
    MatchingDone,
    SparseDone,
    DenseDone { output: PathBuf },
    Exported { path: PathBuf },
    Finished,
}

impl<T: Transport> Orchestrator<T> {
    /// Runs a job, reporting each finished step. The stream ends with the
    /// first error, or after `Finished`.
    pub fn run_job(
        &mut self,
        job: ReconstructionJob,
    ) -> impl Stream<Item = Result<WorkflowMessage, OrchestratorError>> + '_ {
        try_fn_stream(move |emitter: TryStreamEmitter<WorkflowMessage, OrchestratorError>| async move {
            for (image, features) in &job.features {
                let path = self.push_features(image, features).await?;
                emitter.emit(WorkflowMessage::FeaturesWritten { path }).await;
            }

            self.load_image_list(&job.images).await?;
            emitter
                .emit(WorkflowMessage::ImagesLoaded { count: job.images.len() })
                .await;

            if let Some((path, pairs)) = &job.matches {
                self.import_matches(path, pairs).await?;
                emitter
                    .emit(WorkflowMessage::MatchesImported { pairs: pairs.len() })
                    .await;
            }

            self.run_matching().await?;
            emitter.emit(WorkflowMessage::MatchingDone).await;

            self.reconstruct_sparse().await?;
            emitter.emit(WorkflowMessage::SparseDone).await;

            if let Some(output) = job.dense_output {
                self.reconstruct_dense(&output).await?;
                emitter.emit(WorkflowMessage::DenseDone { output }).await;
            }

            if let Some(path) = job.export_path {
                self.export_results(&path).await?;
                emitter.emit(WorkflowMessage::Exported { path }).await;
            }

            if job.exit_when_done {
                info!("Job finished, asking the external tool to exit");
                self.exit().await?;
            }

            emitter.emit(WorkflowMessage::Finished).await;
            Ok::<(), OrchestratorError>(())
        })
    }
}
