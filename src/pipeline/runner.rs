//! Ordered execution of the intake stages for one claimed pair.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::collaborators::Collaborators;
use crate::pairing::{ClaimedPair, FileKind, PairState, Stem};

use super::context::{FolderHandle, PipelineContext, ProjectMetadata, RecordId};
use super::notice::{Notice, RecipientDirectory};
use super::retry::RetryPolicy;

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    Backup,
    ExtractMetadata,
    CreateRecord,
    CreateFolders,
    Transfer,
    Notify,
}

impl Stage {
    pub const ORDER: [Stage; 6] = [
        Stage::Backup,
        Stage::ExtractMetadata,
        Stage::CreateRecord,
        Stage::CreateFolders,
        Stage::Transfer,
        Stage::Notify,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Backup => "backup",
            Stage::ExtractMetadata => "extract-metadata",
            Stage::CreateRecord => "create-record",
            Stage::CreateFolders => "create-folders",
            Stage::Transfer => "transfer",
            Stage::Notify => "notify",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal failure of a required stage.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{stage} failed: {reason}")]
pub struct StageFailure {
    pub stage: Stage,
    pub reason: String,
}

impl StageFailure {
    pub fn new(stage: Stage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            reason: reason.into(),
        }
    }
}

/// Final result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Succeeded {
        record: RecordId,
        folder: FolderHandle,
        notified: bool,
    },
    Failed(StageFailure),
}

impl PipelineOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PipelineOutcome::Succeeded { .. })
    }
}

/// Knobs for the pipeline that are not collaborators.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub retry: RetryPolicy,
    pub drawing_subfolder: String,
    pub document_subfolder: String,
    pub recipients: RecipientDirectory,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            drawing_subfolder: "DWG".to_string(),
            document_subfolder: "PDF".to_string(),
            recipients: RecipientDirectory::default(),
        }
    }
}

impl PipelineOptions {
    fn subfolder(&self, kind: FileKind) -> &str {
        match kind {
            FileKind::Drawing => &self.drawing_subfolder,
            FileKind::Document => &self.document_subfolder,
        }
    }
}

/// Runs the stages for claimed pairs. Cheap to clone; each run owns its
/// own [`PipelineContext`].
#[derive(Clone)]
pub struct PipelineRunner {
    collaborators: Collaborators,
    options: Arc<PipelineOptions>,
}

/// Releases a stem from the pair state when dropped, so a panicking
/// collaborator cannot leave the stem claimed forever.
struct ClaimRelease<'a> {
    state: &'a PairState,
    stem: &'a Stem,
}

impl Drop for ClaimRelease<'_> {
    fn drop(&mut self) {
        self.state.release(self.stem);
        crate::debug_event!("pair", "released", "{}", self.stem);
    }
}

impl PipelineRunner {
    pub fn new(collaborators: Collaborators, options: PipelineOptions) -> Self {
        Self {
            collaborators,
            options: Arc::new(options),
        }
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Run the pipeline for `pair`, then remove its cache entry and claim.
    pub async fn run_claimed(&self, pair: ClaimedPair, state: &PairState) -> PipelineOutcome {
        let _release = ClaimRelease {
            state,
            stem: &pair.stem,
        };
        self.run(&pair).await
    }

    /// Run every stage for `pair` in order.
    ///
    /// A failure in extraction, record creation, folder creation, or
    /// transfer ends the run. Backup and notification failures are logged
    /// and ignored.
    pub async fn run(&self, pair: &ClaimedPair) -> PipelineOutcome {
        let mut ctx = PipelineContext::new(pair);
        crate::log_event!(
            "pipeline",
            "started",
            "{} ({}, {})",
            ctx.stem,
            ctx.drawing.display(),
            ctx.document.display()
        );

        let outcome = match self.run_required(&mut ctx).await {
            Ok((record, folder)) => {
                let notified = self.notify(&ctx).await;
                PipelineOutcome::Succeeded {
                    record,
                    folder,
                    notified,
                }
            }
            Err(failure) => {
                tracing::error!("[pipeline] {}: {failure}", ctx.stem);
                PipelineOutcome::Failed(failure)
            }
        };

        match &outcome {
            PipelineOutcome::Succeeded { record, folder, .. } => {
                crate::log_event!(
                    "pipeline",
                    "succeeded",
                    "{} -> {record} at {folder}",
                    ctx.stem
                );
            }
            PipelineOutcome::Failed(failure) => {
                crate::log_event!("pipeline", "failed", "{} at {}", ctx.stem, failure.stage);
            }
        }

        outcome
    }

    async fn run_required(
        &self,
        ctx: &mut PipelineContext,
    ) -> Result<(RecordId, FolderHandle), StageFailure> {
        self.backup(ctx).await;

        let metadata = self.extract_metadata(ctx).await?;
        ctx.metadata = Some(metadata.clone());

        let record = self.create_record(&ctx.stem, &metadata).await?;
        ctx.record = Some(record.clone());

        let folder = self.create_folders(&ctx.stem, &metadata, &record).await?;
        ctx.folder = Some(folder.clone());

        self.transfer(ctx, &folder).await?;

        Ok((record, folder))
    }

    async fn backup(&self, ctx: &PipelineContext) {
        for path in [&ctx.drawing, &ctx.document] {
            match self.collaborators.backup.backup_file(path).await {
                Ok(Some(copy)) => {
                    crate::debug_event!("backup", "created", "{}", copy.display());
                }
                Ok(None) => {
                    tracing::warn!(
                        "[pipeline] {}: {} produced no copy of {}",
                        ctx.stem,
                        Stage::Backup,
                        path.display()
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "[pipeline] {}: {} of {} failed: {e}",
                        ctx.stem,
                        Stage::Backup,
                        path.display()
                    );
                }
            }
        }
    }

    async fn extract_metadata(
        &self,
        ctx: &PipelineContext,
    ) -> Result<ProjectMetadata, StageFailure> {
        let stage = Stage::ExtractMetadata;
        let fields = self
            .collaborators
            .extractor
            .extract(&ctx.document)
            .await
            .map_err(|e| StageFailure::new(stage, e.to_string()))?
            .ok_or_else(|| {
                StageFailure::new(
                    stage,
                    format!("no metadata in {}", ctx.document.display()),
                )
            })?;

        let metadata = ProjectMetadata::from_fields(&fields)
            .map_err(|key| StageFailure::new(stage, format!("missing required field '{key}'")))?;

        crate::log_event!("pipeline", "metadata", "{}: {metadata}", ctx.stem);
        Ok(metadata)
    }

    async fn create_record(
        &self,
        stem: &Stem,
        metadata: &ProjectMetadata,
    ) -> Result<RecordId, StageFailure> {
        let crm = &self.collaborators.crm;
        let record = self
            .options
            .retry
            .run(stem, Stage::CreateRecord, |_| crm.create_record(metadata))
            .await?;

        crate::log_event!("crm", "record created", "{stem}: {record}");
        Ok(record)
    }

    async fn create_folders(
        &self,
        stem: &Stem,
        metadata: &ProjectMetadata,
        record: &RecordId,
    ) -> Result<FolderHandle, StageFailure> {
        let store = &self.collaborators.store;
        let folder = self
            .options
            .retry
            .run(stem, Stage::CreateFolders, |_| {
                store.create_folder_hierarchy(metadata, record)
            })
            .await?;

        crate::log_event!("store", "folders created", "{stem}: {folder}");
        Ok(folder)
    }

    async fn transfer(
        &self,
        ctx: &PipelineContext,
        folder: &FolderHandle,
    ) -> Result<(), StageFailure> {
        let files = [
            (FileKind::Drawing, ctx.drawing.as_path()),
            (FileKind::Document, ctx.document.as_path()),
        ];

        for (kind, path) in files {
            self.transfer_one(path, folder, self.options.subfolder(kind))
                .await?;
        }

        for (_, path) in files {
            if let Err(e) = tokio::fs::remove_file(path).await {
                tracing::warn!(
                    "[pipeline] {}: transferred but could not remove {}: {e}",
                    ctx.stem,
                    path.display()
                );
            }
        }

        crate::log_event!("store", "transferred", "{} into {folder}", ctx.stem);
        Ok(())
    }

    async fn transfer_one(
        &self,
        path: &Path,
        folder: &FolderHandle,
        subfolder: &str,
    ) -> Result<(), StageFailure> {
        match self
            .collaborators
            .store
            .transfer_file(path, folder, subfolder)
            .await
        {
            Ok(true) => Ok(()),
            Ok(false) => Err(StageFailure::new(
                Stage::Transfer,
                format!("{} was not accepted into {subfolder}", path.display()),
            )),
            Err(e) => Err(StageFailure::new(
                Stage::Transfer,
                format!("{} -> {subfolder}: {e}", path.display()),
            )),
        }
    }

    /// Send the data request. Returns whether it went out.
    async fn notify(&self, ctx: &PipelineContext) -> bool {
        let (Some(metadata), Some(record), Some(folder)) =
            (&ctx.metadata, &ctx.record, &ctx.folder)
        else {
            return false;
        };

        let Some(recipients) = self.options.recipients.resolve(metadata) else {
            tracing::warn!(
                "[pipeline] {}: {} skipped, no address for project manager '{}'",
                ctx.stem,
                Stage::Notify,
                metadata.project_manager
            );
            return false;
        };

        let notice = Notice::compose(metadata, record, folder);
        match self
            .collaborators
            .notifier
            .notify(&recipients, &notice.subject, &notice.body)
            .await
        {
            Ok(true) => {
                crate::log_event!("notify", "sent", "{} to {}", ctx.stem, recipients.join(", "));
                true
            }
            Ok(false) => {
                tracing::warn!("[pipeline] {}: {} was not delivered", ctx.stem, Stage::Notify);
                false
            }
            Err(e) => {
                tracing::warn!("[pipeline] {}: {} failed: {e}", ctx.stem, Stage::Notify);
                false
            }
        }
    }
}
