//! Local-disk collaborator implementations.
//!
//! These back the binary when no remote services are configured: backups
//! next to the source, a folder tree under a destination root, text-based
//! title block extraction, a JSONL record ledger, and a notification outbox.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::{
    BackupService, CollaboratorError, CrmClient, DocumentStore, MetadataExtractor, MetadataFields,
    Notifier,
};
use crate::pairing::Exclusion;
use crate::pipeline::{FolderHandle, ProjectMetadata, RecordId, keys};
use crate::utils::{backup_timestamp, sanitize_filename, sanitize_text};

/// Name of the per-directory backup folder used when no fixed directory
/// is configured.
pub const BACKUP_DIR_NAME: &str = "backups";

/// Copies files into a backup directory with a timestamped name.
#[derive(Debug, Clone, Default)]
pub struct LocalBackup {
    /// Fixed backup directory; `None` uses `<file dir>/backups`.
    dir: Option<PathBuf>,
}

impl LocalBackup {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    fn backup_path(&self, local: &Path) -> Option<PathBuf> {
        let dir = match &self.dir {
            Some(dir) => dir.clone(),
            None => local.parent()?.join(BACKUP_DIR_NAME),
        };
        let stem = local.file_stem()?.to_string_lossy();
        let name = match local.extension() {
            Some(ext) => format!("{stem}_{}.{}", backup_timestamp(), ext.to_string_lossy()),
            None => format!("{stem}_{}", backup_timestamp()),
        };
        Some(dir.join(name))
    }
}

#[async_trait]
impl BackupService for LocalBackup {
    async fn backup_file(&self, local: &Path) -> Result<Option<PathBuf>, CollaboratorError> {
        if !tokio::fs::try_exists(local).await? {
            return Ok(None);
        }
        let Some(target) = self.backup_path(local) else {
            return Ok(None);
        };
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::copy(local, &target).await?;
        crate::log_event!("backup", "created", "{}", target.display());
        Ok(Some(target))
    }

    fn exclusions(&self) -> Vec<Exclusion> {
        match &self.dir {
            Some(dir) => vec![Exclusion::Under(dir.clone())],
            None => vec![Exclusion::DirNamed(BACKUP_DIR_NAME.to_string())],
        }
    }
}

/// Builds the project folder tree under a local destination root.
///
/// Layout: `<root>/<base>/<customer>/<address>/Opp <record>- <project>/`
/// with one subfolder per entry in `subfolders`, plus an optional sibling
/// folder at the address level.
#[derive(Debug, Clone)]
pub struct LocalFolderStore {
    root: PathBuf,
    base_folder: String,
    subfolders: Vec<String>,
    sibling_folder: Option<String>,
}

impl LocalFolderStore {
    pub fn new(
        root: impl Into<PathBuf>,
        base_folder: impl Into<String>,
        subfolders: Vec<String>,
        sibling_folder: Option<String>,
    ) -> Self {
        Self {
            root: root.into(),
            base_folder: base_folder.into(),
            subfolders,
            sibling_folder,
        }
    }

    /// Path of the project folder for `metadata` and `record`.
    pub fn project_path(&self, metadata: &ProjectMetadata, record: &RecordId) -> PathBuf {
        self.root
            .join(sanitize_filename(&self.base_folder))
            .join(sanitize_filename(&metadata.customer))
            .join(sanitize_filename(metadata.address_or_default()))
            .join(sanitize_filename(&format!(
                "Opp {record}- {}",
                metadata.project_name_or_default()
            )))
    }
}

#[async_trait]
impl DocumentStore for LocalFolderStore {
    async fn create_folder_hierarchy(
        &self,
        metadata: &ProjectMetadata,
        record: &RecordId,
    ) -> Result<Option<FolderHandle>, CollaboratorError> {
        let project = self.project_path(metadata, record);
        tokio::fs::create_dir_all(&project).await?;

        for sub in &self.subfolders {
            let path = project.join(sanitize_filename(sub));
            if let Err(e) = tokio::fs::create_dir_all(&path).await {
                tracing::warn!("[store] failed to create subfolder {}: {e}", path.display());
            }
        }

        if let (Some(sibling), Some(address_dir)) = (&self.sibling_folder, project.parent()) {
            let path = address_dir.join(sanitize_filename(sibling));
            if let Err(e) = tokio::fs::create_dir_all(&path).await {
                tracing::warn!("[store] failed to create {}: {e}", path.display());
            }
        }

        Ok(Some(FolderHandle::new(project.to_string_lossy())))
    }

    async fn transfer_file(
        &self,
        local: &Path,
        folder: &FolderHandle,
        subfolder: &str,
    ) -> Result<bool, CollaboratorError> {
        let Some(name) = local.file_name() else {
            return Ok(false);
        };
        let dir = Path::new(folder.as_str()).join(sanitize_filename(subfolder));
        tokio::fs::create_dir_all(&dir).await?;

        let target = unique_destination(&dir.join(name)).await?;
        tokio::fs::copy(local, &target).await?;
        crate::debug_event!("store", "copied", "{} -> {}", local.display(), target.display());
        Ok(true)
    }

    fn exclusions(&self) -> Vec<Exclusion> {
        vec![Exclusion::Under(self.root.clone())]
    }
}

/// `path` if free, otherwise `<stem>_<n>.<ext>` with the first free `n`.
async fn unique_destination(path: &Path) -> Result<PathBuf, std::io::Error> {
    if !tokio::fs::try_exists(path).await? {
        return Ok(path.to_path_buf());
    }

    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1u32;
    loop {
        let candidate = path.with_file_name(format!("{stem}_{counter}{ext}"));
        if !tokio::fs::try_exists(&candidate).await? {
            return Ok(candidate);
        }
        counter += 1;
    }
}

/// Field labels recognized in a title block, per metadata key.
const TITLE_BLOCK_LABELS: &[(&str, &[&str])] = &[
    (keys::CUSTOMER, &["customer", "client", "company", r"job\s+for"]),
    (keys::ADDRESS, &["address", "location", "site", "facility"]),
    (
        keys::PROJECT_MANAGER,
        &[r"project\s+manager", "pm", "manager", "salesperson"],
    ),
    (keys::DRAFTER, &[r"drawn\s+by", "drafter", "designer", "drafted"]),
    (
        keys::PROJECT_NAME,
        &[r"project\s+name", r"job\s+name", "title", "description"],
    ),
];

static TITLE_BLOCK_PATTERNS: OnceLock<Vec<(&'static str, Vec<Regex>)>> = OnceLock::new();

fn title_block_patterns() -> &'static [(&'static str, Vec<Regex>)] {
    TITLE_BLOCK_PATTERNS.get_or_init(|| {
        TITLE_BLOCK_LABELS
            .iter()
            .map(|(key, labels)| {
                let regexes = labels
                    .iter()
                    .filter_map(|label| {
                        Regex::new(&format!(r"(?im)\b{label}\b[ \t]*[:\t ][ \t]*([^\r\n]+)")).ok()
                    })
                    .collect();
                (*key, regexes)
            })
            .collect()
    })
}

static LONG_RULE: OnceLock<Option<Regex>> = OnceLock::new();

fn clean_field_value(value: &str) -> String {
    let rule = LONG_RULE.get_or_init(|| Regex::new(r"[_\-]{3,}").ok());
    let without_rules = match rule {
        Some(re) => re.replace_all(value, "").into_owned(),
        None => value.to_string(),
    };
    sanitize_text(&without_rules)
}

/// Parse title block fields out of document text.
///
/// For each key the first label that yields a non-empty value wins.
pub fn parse_title_block(text: &str) -> MetadataFields {
    let mut fields = HashMap::new();

    for (key, regexes) in title_block_patterns() {
        let value = regexes.iter().find_map(|re| {
            re.captures(text)
                .and_then(|caps| caps.get(1))
                .map(|m| clean_field_value(m.as_str()))
                .filter(|v| !v.is_empty())
        });
        if let Some(value) = value {
            fields.insert(key.to_string(), value);
        }
    }

    fields
}

/// Reads a document as text and extracts its title block fields.
///
/// Returns `None` when the required fields (customer, project manager)
/// are not both found.
#[derive(Debug, Clone, Default)]
pub struct TitleBlockExtractor;

#[async_trait]
impl MetadataExtractor for TitleBlockExtractor {
    async fn extract(&self, document: &Path) -> Result<Option<MetadataFields>, CollaboratorError> {
        let bytes = tokio::fs::read(document).await?;
        let text = String::from_utf8_lossy(&bytes);
        let fields = parse_title_block(&text);

        let has_required = [keys::CUSTOMER, keys::PROJECT_MANAGER]
            .iter()
            .all(|k| fields.contains_key(*k));

        if !has_required {
            crate::debug_event!(
                "extract",
                "incomplete title block",
                "{}: {:?}",
                document.display(),
                fields.keys().collect::<Vec<_>>()
            );
            return Ok(None);
        }

        Ok(Some(fields))
    }
}

#[derive(Serialize)]
struct LedgerLine<'a> {
    id: &'a str,
    created_at: String,
    metadata: &'a ProjectMetadata,
}

/// Allocates record identifiers from an append-only JSONL ledger.
#[derive(Debug)]
pub struct LedgerCrm {
    path: PathBuf,
    prefix: String,
    lock: Mutex<()>,
}

impl LedgerCrm {
    pub fn new(path: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            prefix: prefix.into(),
            lock: Mutex::new(()),
        }
    }

    async fn next_sequence(&self) -> Result<usize, CollaboratorError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(content.lines().filter(|l| !l.trim().is_empty()).count() + 1),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(1),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl CrmClient for LedgerCrm {
    async fn create_record(
        &self,
        metadata: &ProjectMetadata,
    ) -> Result<Option<RecordId>, CollaboratorError> {
        let _guard = self.lock.lock().await;

        let id = format!("{}-{}", self.prefix, self.next_sequence().await?);
        let line = LedgerLine {
            id: &id,
            created_at: chrono::Local::now().to_rfc3339(),
            metadata,
        };
        let mut json = serde_json::to_string(&line)
            .map_err(|e| CollaboratorError::Rejected(e.to_string()))?;
        json.push('\n');

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(json.as_bytes()).await?;
        file.flush().await?;

        Ok(Some(RecordId::new(id)))
    }
}

/// Writes each notification as a text file into an outbox directory.
#[derive(Debug)]
pub struct OutboxNotifier {
    dir: PathBuf,
    counter: AtomicU64,
}

impl OutboxNotifier {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            counter: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl Notifier for OutboxNotifier {
    async fn notify(
        &self,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> Result<bool, CollaboratorError> {
        if recipients.is_empty() {
            return Ok(false);
        }

        tokio::fs::create_dir_all(&self.dir).await?;
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        let name = format!(
            "{}-{seq:04}.txt",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        );

        let (to, cc) = recipients.split_at(1);
        let mut message = format!("To: {}\n", to.join(", "));
        if !cc.is_empty() {
            message.push_str(&format!("Cc: {}\n", cc.join(", ")));
        }
        message.push_str(&format!("Subject: {subject}\n\n{body}"));

        tokio::fs::write(self.dir.join(name), message).await?;
        Ok(true)
    }
}
