use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::StorageBackend;

/// Backends are selected here, exactly once at startup. Everything
/// after construction goes through the `StorageBackend` trait.
#[derive(Debug, Clone, Deserialize)]
pub enum BackendConfigs {
    #[serde(rename = "local")]
    FileSystem {
        /// The root directory renditions are written beneath. Created
        /// if it does not exist.
        directory: PathBuf,
    },

    #[serde(rename = "object-store")]
    BlobStorage {
        /// The bucket objects are written to.
        bucket: String,

        /// The AWS region name, e.g. `us-east-1`.
        region: String,

        /// An optional custom endpoint for S3-compatible services
        /// (MinIO, Ceph RGW, etc.)
        endpoint: Option<String>,

        /// Static credentials. When absent the standard AWS credential
        /// chain (environment, profile, instance metadata) is used.
        access_key: Option<String>,
        secret_key: Option<String>,

        /// The canned ACL applied to every stored object.
        acl: String,
    },
}

impl BackendConfigs {
    pub async fn connect(&self) -> Result<Arc<dyn StorageBackend>, ConfigError> {
        match self {
            Self::FileSystem { directory } => {
                let backend = super::filesystem::FileSystemBackend::connect(directory.clone())
                    .await
                    .map_err(|e| ConfigError::BackendInit(e.to_string()))?;
                Ok(Arc::new(backend))
            }
            Self::BlobStorage {
                bucket,
                region,
                endpoint,
                access_key,
                secret_key,
                acl,
            } => {
                if bucket.is_empty() {
                    return Err(ConfigError::MissingBucket);
                }
                if acl.is_empty() {
                    return Err(ConfigError::MissingAccessPolicy);
                }

                let backend = super::blob_storage::BlobStorageBackend::connect(
                    bucket.clone(),
                    region.clone(),
                    endpoint.clone(),
                    access_key.as_deref(),
                    secret_key.as_deref(),
                    acl.clone(),
                )
                .map_err(|e| ConfigError::BackendInit(e.to_string()))?;
                Ok(Arc::new(backend))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_tags_match_the_config_surface() {
        let cfg: BackendConfigs = serde_yaml::from_str(
            r#"
            local:
              directory: ./data
            "#,
        )
        .expect("local backend should parse");
        assert!(matches!(cfg, BackendConfigs::FileSystem { .. }));

        let cfg: BackendConfigs = serde_yaml::from_str(
            r#"
            object-store:
              bucket: media
              region: us-east-1
              acl: public-read
            "#,
        )
        .expect("object-store backend should parse");
        assert!(matches!(cfg, BackendConfigs::BlobStorage { .. }));
    }

    #[tokio::test]
    async fn empty_bucket_is_rejected_at_connect() {
        let cfg = BackendConfigs::BlobStorage {
            bucket: String::new(),
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            acl: "public-read".to_string(),
        };

        assert!(matches!(
            cfg.connect().await,
            Err(ConfigError::MissingBucket)
        ));
    }

    #[tokio::test]
    async fn empty_acl_is_rejected_at_connect() {
        let cfg = BackendConfigs::BlobStorage {
            bucket: "media".to_string(),
            region: "us-east-1".to_string(),
            endpoint: None,
            access_key: None,
            secret_key: None,
            acl: String::new(),
        };

        assert!(matches!(
            cfg.connect().await,
            Err(ConfigError::MissingAccessPolicy)
        ));
    }
}
