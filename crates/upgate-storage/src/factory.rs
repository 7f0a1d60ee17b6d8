use crate::{LocalStorage, Storage, StorageError, StorageResult};
use std::sync::Arc;
use upgate_core::Config;

/// Create a storage backend based on configuration
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    if config.upload_dir.trim().is_empty() {
        return Err(StorageError::ConfigError(
            "UPLOAD_DIR not configured".to_string(),
        ));
    }

    let storage =
        LocalStorage::new(config.upload_dir.clone(), config.upload_base_url.clone()).await?;

    tracing::info!(
        upload_dir = %config.upload_dir,
        base_url = %config.upload_base_url,
        "Local storage backend initialized"
    );

    Ok(Arc::new(storage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_create_storage_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let upload_dir = dir.path().join("secure_uploads");
        let mut vars = HashMap::new();
        vars.insert("UPLOAD_DIR".to_string(), upload_dir.display().to_string());
        let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();

        let storage = create_storage(&config).await.unwrap();
        assert!(upload_dir.is_dir());
        assert!(!storage.exists("nothing.png").await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_upload_dir_rejected() {
        let vars: HashMap<String, String> =
            [("UPLOAD_DIR".to_string(), " ".to_string())].into_iter().collect();
        let config = Config::from_lookup(|key| vars.get(key).cloned()).unwrap();
        assert!(matches!(
            create_storage(&config).await,
            Err(StorageError::ConfigError(_))
        ));
    }
}
