//! Collaborator contracts consumed by the pipeline.
//!
//! Each stage of the pipeline delegates to one of these traits. The engine
//! only sees the traits; concrete implementations live in [`local`] and
//! [`http`], and tests supply their own.

pub mod http;
pub mod local;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::pairing::Exclusion;
use crate::pipeline::{FolderHandle, ProjectMetadata, RecordId};

/// Raw metadata fields as returned by an extractor.
pub type MetadataFields = HashMap<String, String>;

/// Errors reported by collaborator implementations.
#[derive(Error, Debug)]
pub enum CollaboratorError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Rejected: {0}")]
    Rejected(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

/// Pulls title block metadata out of a document file.
#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// Returns `None` when the document is unreadable or has no title block.
    async fn extract(&self, document: &Path) -> Result<Option<MetadataFields>, CollaboratorError>;
}

/// Creates a record for the project in the CRM.
#[async_trait]
pub trait CrmClient: Send + Sync {
    async fn create_record(
        &self,
        metadata: &ProjectMetadata,
    ) -> Result<Option<RecordId>, CollaboratorError>;
}

/// Destination store for the project folder hierarchy and files.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create the project folder and its fixed subfolders.
    async fn create_folder_hierarchy(
        &self,
        metadata: &ProjectMetadata,
        record: &RecordId,
    ) -> Result<Option<FolderHandle>, CollaboratorError>;

    /// Copy a local file into `subfolder` beneath `folder`.
    async fn transfer_file(
        &self,
        local: &Path,
        folder: &FolderHandle,
        subfolder: &str,
    ) -> Result<bool, CollaboratorError>;

    /// Local directories this store writes into, if any.
    fn exclusions(&self) -> Vec<Exclusion> {
        Vec::new()
    }
}

/// Outbound notification channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<bool, CollaboratorError>;
}

/// Best-effort local backup of source files.
#[async_trait]
pub trait BackupService: Send + Sync {
    async fn backup_file(&self, local: &Path) -> Result<Option<PathBuf>, CollaboratorError>;

    /// Where backup copies land, so the engine does not pair them.
    fn exclusions(&self) -> Vec<Exclusion> {
        Vec::new()
    }
}

/// The full set of collaborators one pipeline run needs.
#[derive(Clone)]
pub struct Collaborators {
    pub backup: Arc<dyn BackupService>,
    pub extractor: Arc<dyn MetadataExtractor>,
    pub crm: Arc<dyn CrmClient>,
    pub store: Arc<dyn DocumentStore>,
    pub notifier: Arc<dyn Notifier>,
}

impl Collaborators {
    /// Every location the collaborators write files into.
    pub fn exclusions(&self) -> Vec<Exclusion> {
        let mut exclusions = self.backup.exclusions();
        exclusions.extend(self.store.exclusions());
        exclusions
    }
}
