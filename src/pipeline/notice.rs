//! Notification recipients and message composition.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::context::{FolderHandle, ProjectMetadata, RecordId};

/// Name to address directory for project managers and drafters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientDirectory {
    #[serde(default)]
    pub project_managers: HashMap<String, String>,
    #[serde(default)]
    pub drafters: HashMap<String, String>,
}

impl RecipientDirectory {
    /// Recipients for a project: the PM first, then the drafter when known
    /// and different. `None` if the PM has no address.
    pub fn resolve(&self, metadata: &ProjectMetadata) -> Option<Vec<String>> {
        let pm = lookup(&self.project_managers, &metadata.project_manager)?;
        let mut recipients = vec![pm.to_string()];

        if let Some(drafter) = metadata
            .drafter
            .as_deref()
            .and_then(|name| lookup(&self.drafters, name))
        {
            if !drafter.eq_ignore_ascii_case(pm) {
                recipients.push(drafter.to_string());
            }
        }

        Some(recipients)
    }
}

/// Exact match first, then case-insensitive on the trimmed name.
fn lookup<'a>(directory: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    if let Some(addr) = directory.get(name) {
        return Some(addr);
    }
    let name = name.trim();
    directory
        .iter()
        .find(|(k, _)| k.trim().eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Subject and body of the data request sent to the project manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub subject: String,
    pub body: String,
}

impl Notice {
    pub fn compose(metadata: &ProjectMetadata, record: &RecordId, folder: &FolderHandle) -> Self {
        let subject = format!(
            "Seizmic Data Required - Opp {record} - {}",
            metadata.customer
        );

        let body = format!(
            "Dear {pm},\n\
             \n\
             A new opportunity has been created automatically:\n\
             \n\
             Opportunity Number: {record}\n\
             Customer: {customer}\n\
             Facility Address: {address}\n\
             Project: {project}\n\
             Drafter: {drafter}\n\
             \n\
             To complete the Seizmic portal submission, please reply with:\n\
             \n\
             1. Prelim Type: ________________\n\
             2. Manufacturer: _______________\n\
             3. Rack Type: _________________\n\
             4. Anchor Type: _______________\n\
             \n\
             The project files have been filed at:\n\
             {folder}\n\
             \n\
             Pairwatch\n",
            pm = metadata.project_manager,
            customer = metadata.customer,
            address = metadata.address_or_default(),
            project = metadata.project_name_or_default(),
            drafter = metadata.drafter_or_default(),
        );

        Self { subject, body }
    }
}
