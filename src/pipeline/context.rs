//! Values produced and consumed by pipeline stages.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::pairing::{ClaimedPair, Stem};

/// Title block fields extracted from a pair's document.
///
/// `customer` and `project_manager` are required; the rest are optional.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub customer: String,
    pub project_manager: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drafter: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
}

/// Recognized metadata keys.
pub mod keys {
    pub const CUSTOMER: &str = "customer";
    pub const ADDRESS: &str = "address";
    pub const PROJECT_MANAGER: &str = "project_manager";
    pub const DRAFTER: &str = "drafter";
    pub const PROJECT_NAME: &str = "project_name";
}

impl ProjectMetadata {
    /// Build from a raw field mapping, failing with the first missing
    /// required key.
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, &'static str> {
        let get = |key: &str| {
            fields
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Ok(Self {
            customer: get(keys::CUSTOMER).ok_or(keys::CUSTOMER)?,
            project_manager: get(keys::PROJECT_MANAGER).ok_or(keys::PROJECT_MANAGER)?,
            address: get(keys::ADDRESS),
            drafter: get(keys::DRAFTER),
            project_name: get(keys::PROJECT_NAME),
        })
    }

    pub fn address_or_default(&self) -> &str {
        self.address.as_deref().unwrap_or("Unknown Address")
    }

    pub fn project_name_or_default(&self) -> &str {
        self.project_name.as_deref().unwrap_or("Project")
    }

    pub fn drafter_or_default(&self) -> &str {
        self.drafter.as_deref().unwrap_or("Unknown")
    }
}

impl fmt::Display for ProjectMetadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "customer={} pm={} address={} project={}",
            self.customer,
            self.project_manager,
            self.address_or_default(),
            self.project_name_or_default()
        )
    }
}

/// Identifier of the record created in the CRM.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque handle to a destination folder, as returned by the document store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderHandle(String);

impl FolderHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FolderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-run state, owned by the task executing one pipeline.
#[derive(Debug, Clone)]
pub struct PipelineContext {
    pub stem: Stem,
    pub drawing: PathBuf,
    pub document: PathBuf,
    pub metadata: Option<ProjectMetadata>,
    pub record: Option<RecordId>,
    pub folder: Option<FolderHandle>,
}

impl PipelineContext {
    pub fn new(pair: &ClaimedPair) -> Self {
        Self {
            stem: pair.stem.clone(),
            drawing: pair.drawing.clone(),
            document: pair.document.clone(),
            metadata: None,
            record: None,
            folder: None,
        }
    }
}
