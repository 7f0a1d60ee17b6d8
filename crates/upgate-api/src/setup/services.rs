//! Collaborator wiring: storage, keyed store, scanner and the pipeline.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use upgate_core::Config;
use upgate_services::{
    create_storage, DisabledScanner, MalwareScanner, MemoryStore, UploadAdmissionPipeline,
};

use crate::state::AppState;

#[cfg(feature = "clamav")]
use upgate_services::ClamAVService;

/// How often expired rate-limit windows and hash records are purged.
const STORE_CLEANUP_INTERVAL: Duration = Duration::from_secs(300);

pub async fn initialize_services(config: &Config) -> Result<Arc<AppState>> {
    let storage = create_storage(config)
        .await
        .context("Failed to initialize storage")?;

    let store = Arc::new(MemoryStore::new());
    spawn_store_cleanup(store.clone());

    #[cfg(feature = "clamav")]
    {
        let clamav = setup_clamav(config);
        let scanner: Arc<dyn MalwareScanner> = match &clamav {
            Some(service) => Arc::new(service.clone()),
            None => Arc::new(DisabledScanner),
        };
        let pipeline =
            UploadAdmissionPipeline::new(config.admission_policy(), storage, scanner, store);
        let mut state = AppState::new(config.clone(), pipeline);
        if let Some(service) = clamav {
            state = state.with_clamav(service);
        }
        Ok(Arc::new(state))
    }

    #[cfg(not(feature = "clamav"))]
    {
        if config.clamav_enabled {
            return Err(anyhow::anyhow!(
                "CLAMAV_ENABLED is true but this build has no ClamAV support"
            ));
        }
        tracing::warn!("Malware scanning disabled");
        let scanner: Arc<dyn MalwareScanner> = Arc::new(DisabledScanner);
        let pipeline =
            UploadAdmissionPipeline::new(config.admission_policy(), storage, scanner, store);
        Ok(Arc::new(AppState::new(config.clone(), pipeline)))
    }
}

#[cfg(feature = "clamav")]
fn setup_clamav(config: &Config) -> Option<ClamAVService> {
    if !config.clamav_enabled {
        tracing::warn!("Malware scanning disabled, uploads will not be scanned");
        return None;
    }
    tracing::info!(
        host = %config.clamav_host,
        port = config.clamav_port,
        timeout_secs = config.clamav_timeout_secs,
        "ClamAV scanning enabled"
    );
    Some(ClamAVService::with_timeout(
        config.clamav_host.clone(),
        config.clamav_port,
        config.clamav_timeout_secs,
    ))
}

fn spawn_store_cleanup(store: Arc<MemoryStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(STORE_CLEANUP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = store.cleanup_expired().await;
            if removed > 0 {
                tracing::debug!(removed, "Purged expired store entries");
            }
        }
    });
}
