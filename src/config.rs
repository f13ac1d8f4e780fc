//! Configuration for the pairing engine and its local collaborators.
//!
//! Layered like this, later layers winning:
//! - Default values
//! - `.pairwatch/settings.toml` (searched upward from the current directory)
//! - Environment variables
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `PW_` and use double
//! underscores to separate nested levels:
//! - `PW_WATCH__ROOT=/srv/projects` sets `watch.root`
//! - `PW_PIPELINE__RETRY_ATTEMPTS=5` sets `pipeline.retry_attempts`
//! - `PW_LOGGING__DEFAULT=debug` sets `logging.default`

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::pairing::ExtensionPair;
use crate::pipeline::{PipelineOptions, RecipientDirectory, RetryPolicy};
use crate::utils::resolve_path;

const CONFIG_DIR: &str = ".pairwatch";
const CONFIG_FILE: &str = "settings.toml";

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub watch: WatchConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub backup: BackupConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub crm: CrmConfig,

    #[serde(default)]
    pub notifications: NotificationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct WatchConfig {
    /// Root of the watched tree
    #[serde(default = "default_watch_root")]
    pub root: PathBuf,

    /// Extension of the drawing half of a pair
    #[serde(default = "default_drawing_extension")]
    pub drawing_extension: String,

    /// Extension of the document half of a pair
    #[serde(default = "default_document_extension")]
    pub document_extension: String,

    /// Backfill existing files before watching
    #[serde(default = "default_true")]
    pub scan_on_start: bool,

    /// Quiet period before a new file is considered written
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Capacity of the notification channel
    #[serde(default = "default_event_channel_size")]
    pub event_channel_size: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PipelineConfig {
    /// Attempts for the record and folder stages
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Delay between attempts
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Wait for in-flight pipelines on shutdown
    #[serde(default = "default_true")]
    pub wait_on_stop: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct BackupConfig {
    /// Fixed backup directory; unset means `<file dir>/backups`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StoreConfig {
    /// Local root under which project folders are created
    #[serde(default = "default_destination_root")]
    pub destination_root: PathBuf,

    #[serde(default = "default_base_folder")]
    pub base_folder: String,

    #[serde(default = "default_drawing_subfolder")]
    pub drawing_subfolder: String,

    #[serde(default = "default_document_subfolder")]
    pub document_subfolder: String,

    /// Auxiliary subfolders created in every project folder
    #[serde(default = "default_extra_subfolders")]
    pub extra_subfolders: Vec<String>,

    /// Folder created next to the project folder, at the address level;
    /// empty disables it
    #[serde(
        default = "default_sibling_folder",
        skip_serializing_if = "Option::is_none"
    )]
    pub sibling_folder: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CrmConfig {
    /// Webhook endpoint; unset uses the local ledger
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,

    #[serde(default = "default_record_prefix")]
    pub record_prefix: String,

    #[serde(default = "default_crm_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NotificationConfig {
    #[serde(default = "default_outbox_dir")]
    pub outbox_dir: PathBuf,

    /// Project manager name -> address
    #[serde(default)]
    pub project_managers: HashMap<String, String>,

    /// Drafter name -> address
    #[serde(default)]
    pub drafters: HashMap<String, String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level: error, warn, info, debug, trace
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `pairwatch::watcher = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_true() -> bool {
    true
}
fn default_watch_root() -> PathBuf {
    PathBuf::from("inbox")
}
fn default_drawing_extension() -> String {
    "dwg".to_string()
}
fn default_document_extension() -> String {
    "pdf".to_string()
}
fn default_settle_ms() -> u64 {
    500
}
fn default_event_channel_size() -> usize {
    256
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    1000
}
fn default_destination_root() -> PathBuf {
    PathBuf::from("pairwatch-store")
}
fn default_base_folder() -> String {
    "Projects - Documents".to_string()
}
fn default_drawing_subfolder() -> String {
    "DWG".to_string()
}
fn default_document_subfolder() -> String {
    "PDF".to_string()
}
fn default_extra_subfolders() -> Vec<String> {
    ["Calculations", "Vendors", "Purchase Order", "Photos", "PPT", "Proposals"]
        .into_iter()
        .map(String::from)
        .collect()
}
fn default_sibling_folder() -> Option<String> {
    Some("As Built".to_string())
}
fn default_ledger_path() -> PathBuf {
    PathBuf::from(".pairwatch/records.jsonl")
}
fn default_record_prefix() -> String {
    "OPP".to_string()
}
fn default_crm_timeout_secs() -> u64 {
    30
}
fn default_outbox_dir() -> PathBuf {
    PathBuf::from(".pairwatch/outbox")
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            root: default_watch_root(),
            drawing_extension: default_drawing_extension(),
            document_extension: default_document_extension(),
            scan_on_start: true,
            settle_ms: default_settle_ms(),
            event_channel_size: default_event_channel_size(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            wait_on_stop: true,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            destination_root: default_destination_root(),
            base_folder: default_base_folder(),
            drawing_subfolder: default_drawing_subfolder(),
            document_subfolder: default_document_subfolder(),
            extra_subfolders: default_extra_subfolders(),
            sibling_folder: default_sibling_folder(),
        }
    }
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            ledger_path: default_ledger_path(),
            record_prefix: default_record_prefix(),
            timeout_secs: default_crm_timeout_secs(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            outbox_dir: default_outbox_dir(),
            project_managers: HashMap::new(),
            drafters: HashMap::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));
        Self::load_from(config_path)
    }

    /// Load configuration from a specific file (plus defaults and env)
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nested levels
            .merge(Env::prefixed("PW_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find `.pairwatch/settings.toml` from the current directory upward
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current.ancestors().find_map(|ancestor| {
            let config_dir = ancestor.join(CONFIG_DIR);
            config_dir
                .is_dir()
                .then(|| config_dir.join(CONFIG_FILE))
        })
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<(), String> {
        let pair = self.extension_pair();
        for ext in [&pair.drawing, &pair.document] {
            if ext.is_empty() {
                return Err("pair extensions must not be empty".to_string());
            }
            if ext.contains('.') {
                return Err(format!("extension '{ext}' must not contain a dot"));
            }
        }
        if pair.drawing == pair.document {
            return Err(format!(
                "drawing and document extensions are both '{}'",
                pair.drawing
            ));
        }
        if self.pipeline.retry_attempts == 0 {
            return Err("pipeline.retry_attempts must be at least 1".to_string());
        }

        // Output written inside the watched tree would be paired again
        let root = resolve_path(&self.watch.root);
        let outputs = [
            ("store.destination_root", Some(&self.store.destination_root)),
            ("backup.dir", self.backup.dir.as_ref()),
        ];
        for (key, path) in outputs {
            let Some(path) = path else {
                continue;
            };
            if resolve_path(path).starts_with(&root) {
                return Err(format!(
                    "{key} ({}) must not lie inside watch.root ({})",
                    path.display(),
                    self.watch.root.display()
                ));
            }
        }
        Ok(())
    }

    pub fn extension_pair(&self) -> ExtensionPair {
        ExtensionPair::new(
            &self.watch.drawing_extension,
            &self.watch.document_extension,
        )
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.pipeline.retry_attempts,
            Duration::from_millis(self.pipeline.retry_delay_ms),
        )
    }

    pub fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            retry: self.retry_policy(),
            drawing_subfolder: self.store.drawing_subfolder.clone(),
            document_subfolder: self.store.document_subfolder.clone(),
            recipients: RecipientDirectory {
                project_managers: self.notifications.project_managers.clone(),
                drafters: self.notifications.drafters.clone(),
            },
        }
    }

    /// Subfolders every project folder gets: the two file kinds first.
    pub fn project_subfolders(&self) -> Vec<String> {
        let mut subfolders = vec![
            self.store.drawing_subfolder.clone(),
            self.store.document_subfolder.clone(),
        ];
        for extra in &self.store.extra_subfolders {
            if !subfolders.contains(extra) {
                subfolders.push(extra.clone());
            }
        }
        subfolders
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Write a default settings file in the current directory
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        Settings::default().save(&config_path)?;
        Ok(config_path)
    }
}
