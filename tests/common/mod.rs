//! Recording fake collaborators shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pairwatch::collaborators::{
    BackupService, CollaboratorError, Collaborators, CrmClient, DocumentStore, MetadataExtractor,
    MetadataFields, Notifier,
};
use pairwatch::pipeline::{FolderHandle, ProjectMetadata, RecordId};
use pairwatch::{Stage, Stem};
use parking_lot::Mutex;

pub const PM_NAME: &str = "Mark Westover";
pub const PM_ADDRESS: &str = "mark@example.com";

/// One fake implementing every collaborator, keyed by stem.
///
/// The extractor reports the stem as customer and project name, so later
/// stages can recover the stem from the metadata.
#[derive(Default)]
pub struct Fake {
    calls: Mutex<Vec<(String, Stage)>>,
    crm_failures: Mutex<HashMap<String, u32>>,
    crm_always_fail: Mutex<HashSet<String>>,
    crm_delay: Mutex<HashMap<String, Duration>>,
    no_metadata: Mutex<HashSet<String>>,
    transfer_fail: Mutex<HashSet<String>>,
    record_counter: Mutex<u32>,
}

impl Fake {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn collaborators(self: &Arc<Self>) -> Collaborators {
        Collaborators {
            backup: self.clone(),
            extractor: self.clone(),
            crm: self.clone(),
            store: self.clone(),
            notifier: self.clone(),
        }
    }

    /// Fail the first `n` CRM calls for `stem`.
    pub fn fail_crm_times(&self, stem: &str, n: u32) {
        self.crm_failures.lock().insert(stem.to_string(), n);
    }

    pub fn fail_crm_always(&self, stem: &str) {
        self.crm_always_fail.lock().insert(stem.to_string());
    }

    pub fn delay_crm(&self, stem: &str, delay: Duration) {
        self.crm_delay.lock().insert(stem.to_string(), delay);
    }

    pub fn without_metadata(&self, stem: &str) {
        self.no_metadata.lock().insert(stem.to_string());
    }

    pub fn fail_transfer(&self, stem: &str) {
        self.transfer_fail.lock().insert(stem.to_string());
    }

    /// Every call made for `stem`, in order.
    pub fn calls_for(&self, stem: &str) -> Vec<Stage> {
        self.calls
            .lock()
            .iter()
            .filter(|(s, _)| s == stem)
            .map(|(_, stage)| *stage)
            .collect()
    }

    /// Calls for `stem` with consecutive repeats collapsed.
    pub fn stage_sequence(&self, stem: &str) -> Vec<Stage> {
        let mut seq = self.calls_for(stem);
        seq.dedup();
        seq
    }

    pub fn count(&self, stem: &str, stage: Stage) -> usize {
        self.calls_for(stem).iter().filter(|s| **s == stage).count()
    }

    /// Calls to `stage` across every stem.
    pub fn total(&self, stage: Stage) -> usize {
        self.calls.lock().iter().filter(|(_, s)| *s == stage).count()
    }

    fn record(&self, stem: &str, stage: Stage) {
        self.calls.lock().push((stem.to_string(), stage));
    }
}

fn stem_of(path: &Path) -> String {
    Stem::from_path(path)
        .map(|s| s.to_string())
        .unwrap_or_default()
}

#[async_trait]
impl BackupService for Fake {
    async fn backup_file(&self, local: &Path) -> Result<Option<PathBuf>, CollaboratorError> {
        self.record(&stem_of(local), Stage::Backup);
        Ok(Some(local.with_extension("bak")))
    }
}

#[async_trait]
impl MetadataExtractor for Fake {
    async fn extract(&self, document: &Path) -> Result<Option<MetadataFields>, CollaboratorError> {
        let stem = stem_of(document);
        self.record(&stem, Stage::ExtractMetadata);

        if self.no_metadata.lock().contains(&stem) {
            return Ok(None);
        }

        let mut fields = HashMap::new();
        fields.insert("customer".to_string(), stem.clone());
        fields.insert("project_manager".to_string(), PM_NAME.to_string());
        fields.insert("project_name".to_string(), stem);
        Ok(Some(fields))
    }
}

#[async_trait]
impl CrmClient for Fake {
    async fn create_record(
        &self,
        metadata: &ProjectMetadata,
    ) -> Result<Option<RecordId>, CollaboratorError> {
        let stem = metadata.customer.clone();
        self.record(&stem, Stage::CreateRecord);

        let delay = self.crm_delay.lock().get(&stem).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.crm_always_fail.lock().contains(&stem) {
            return Err(CollaboratorError::Unavailable("crm down".to_string()));
        }

        {
            let mut failures = self.crm_failures.lock();
            if let Some(remaining) = failures.get_mut(&stem) {
                if *remaining > 0 {
                    *remaining -= 1;
                    return Err(CollaboratorError::Unavailable("crm busy".to_string()));
                }
            }
        }

        let mut counter = self.record_counter.lock();
        *counter += 1;
        Ok(Some(RecordId::new(format!("OPP-{}", *counter))))
    }
}

#[async_trait]
impl DocumentStore for Fake {
    async fn create_folder_hierarchy(
        &self,
        metadata: &ProjectMetadata,
        record: &RecordId,
    ) -> Result<Option<FolderHandle>, CollaboratorError> {
        self.record(&metadata.customer, Stage::CreateFolders);
        Ok(Some(FolderHandle::new(format!(
            "/dest/{}/{record}",
            metadata.customer
        ))))
    }

    async fn transfer_file(
        &self,
        local: &Path,
        _folder: &FolderHandle,
        _subfolder: &str,
    ) -> Result<bool, CollaboratorError> {
        let stem = stem_of(local);
        self.record(&stem, Stage::Transfer);
        Ok(!self.transfer_fail.lock().contains(&stem))
    }
}

#[async_trait]
impl Notifier for Fake {
    async fn notify(
        &self,
        _recipients: &[String],
        subject: &str,
        _body: &str,
    ) -> Result<bool, CollaboratorError> {
        // Subject ends with the customer, which is the stem
        let stem = subject.rsplit(" - ").next().unwrap_or_default().to_string();
        self.record(&stem, Stage::Notify);
        Ok(true)
    }
}

/// Create both files of a pair in `dir` and return (drawing, document).
pub fn write_pair(dir: &Path, stem: &str) -> (PathBuf, PathBuf) {
    let drawing = dir.join(format!("{stem}.dwg"));
    let document = dir.join(format!("{stem}.pdf"));
    fs::write(&drawing, b"drawing").unwrap();
    fs::write(&document, b"document").unwrap();
    (drawing, document)
}
