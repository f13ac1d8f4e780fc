//! Watch command: run the engine until Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::collaborators::http::WebhookCrm;
use crate::collaborators::local::{
    LedgerCrm, LocalBackup, LocalFolderStore, OutboxNotifier, TitleBlockExtractor,
};
use crate::collaborators::{Collaborators, CrmClient};
use crate::config::Settings;
use crate::notifications::{EngineEvent, EventBroadcaster};
use crate::pipeline::PipelineOutcome;
use crate::watcher::Engine;

/// Collaborators backed by local disk, with the webhook CRM when configured.
pub fn build_collaborators(config: &Settings) -> Result<Collaborators> {
    let crm: Arc<dyn CrmClient> = match config
        .crm
        .webhook_url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
    {
        Some(url) => Arc::new(
            WebhookCrm::new(url, Duration::from_secs(config.crm.timeout_secs))
                .context("Failed to build CRM webhook client")?,
        ),
        None => Arc::new(LedgerCrm::new(
            config.crm.ledger_path.clone(),
            config.crm.record_prefix.clone(),
        )),
    };

    let sibling = config
        .store
        .sibling_folder
        .clone()
        .filter(|name| !name.trim().is_empty());

    Ok(Collaborators {
        backup: Arc::new(LocalBackup::new(config.backup.dir.clone())),
        extractor: Arc::new(TitleBlockExtractor),
        crm,
        store: Arc::new(LocalFolderStore::new(
            config.store.destination_root.clone(),
            config.store.base_folder.clone(),
            config.project_subfolders(),
            sibling,
        )),
        notifier: Arc::new(OutboxNotifier::new(config.notifications.outbox_dir.clone())),
    })
}

/// Token cancelled by the first Ctrl-C. Installed before the engine
/// starts so an interrupt during the startup scan is handled too.
fn shutdown_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("[watch] cannot listen for Ctrl-C: {e}");
            return;
        }
        crate::log_event!("watch", "interrupt received");
        cancel.cancel();
    });
    token
}

pub async fn run(config: &Settings, root: Option<PathBuf>, no_scan: bool) -> Result<()> {
    let mut config = config.clone();
    if let Some(root) = root {
        config.watch.root = root;
    }
    config
        .validate()
        .map_err(|reason| anyhow::anyhow!("Invalid configuration: {reason}"))?;

    let shutdown = shutdown_on_ctrl_c();
    let broadcaster = EventBroadcaster::default();
    let mut events = broadcaster.subscribe();

    let engine = Engine::builder()
        .root(config.watch.root.clone())
        .extensions(config.extension_pair())
        .collaborators(build_collaborators(&config)?)
        .pipeline_options(config.pipeline_options())
        .broadcaster(broadcaster)
        .shutdown_token(shutdown.clone())
        .scan_on_start(config.watch.scan_on_start && !no_scan)
        .settle_ms(config.watch.settle_ms)
        .channel_size(config.watch.event_channel_size)
        .start()
        .await
        .context("Failed to start watcher")?;

    if engine.scan_report().cancelled {
        println!("Startup scan interrupted");
    } else {
        println!("Watching {} (Ctrl-C to stop)", engine.root().display());
    }

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            event = events.recv() => match event {
                Ok(EngineEvent::PipelineFinished { stem, outcome }) => match outcome {
                    PipelineOutcome::Succeeded { record, folder, .. } => {
                        println!("{stem}: filed as {record} in {folder}");
                    }
                    PipelineOutcome::Failed(failure) => {
                        eprintln!("{stem}: {failure}");
                    }
                },
                Ok(_) => {}
                Err(RecvError::Lagged(n)) => {
                    tracing::warn!("[watch] missed {n} engine events");
                }
                Err(RecvError::Closed) => break,
            }
        }
    }

    println!("Stopping...");
    engine.stop(config.pipeline.wait_on_stop).await;
    Ok(())
}
