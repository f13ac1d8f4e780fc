//! CRM record creation through an HTTP webhook.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use super::{CollaboratorError, CrmClient};
use crate::pipeline::{ProjectMetadata, RecordId};

/// Posts project metadata as JSON and reads the record id from the reply.
///
/// The endpoint must answer with a 2xx status and a JSON object carrying
/// an `id` field (string or number).
#[derive(Debug, Clone)]
pub struct WebhookCrm {
    client: reqwest::Client,
    url: String,
}

impl WebhookCrm {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, CollaboratorError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

/// Pull a record id out of a webhook response body.
pub fn record_id_from_response(body: &Value) -> Option<RecordId> {
    match body.get("id")? {
        Value::String(s) if !s.trim().is_empty() => Some(RecordId::new(s.trim())),
        Value::Number(n) => Some(RecordId::new(n.to_string())),
        _ => None,
    }
}

#[async_trait]
impl CrmClient for WebhookCrm {
    async fn create_record(
        &self,
        metadata: &ProjectMetadata,
    ) -> Result<Option<RecordId>, CollaboratorError> {
        let response = self.client.post(&self.url).json(metadata).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollaboratorError::Rejected(format!(
                "{} answered {status}",
                self.url
            )));
        }

        let body: Value = response.json().await?;
        crate::debug_event!("crm", "webhook reply", "{body}");
        Ok(record_id_from_response(&body))
    }
}
