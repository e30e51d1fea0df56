use async_trait::async_trait;
use bytes::Bytes;
use rusoto_core::credential::{ChainProvider, StaticProvider};
use rusoto_core::{HttpClient, Region, RusotoError};
use rusoto_s3::{
    Delete, DeleteObjectsRequest, GetObjectError, GetObjectRequest, ObjectIdentifier,
    PutObjectRequest, S3Client, S3,
};
use tokio::io::AsyncReadExt;

use crate::error::{DeleteError, FailedDelete};
use crate::StorageBackend;

pub struct BlobStorageBackend {
    client: S3Client,
    bucket: String,
    acl: String,
}

impl BlobStorageBackend {
    pub fn connect(
        bucket: String,
        region: String,
        endpoint: Option<String>,
        access_key: Option<&str>,
        secret_key: Option<&str>,
        acl: String,
    ) -> anyhow::Result<Self> {
        let region = match endpoint {
            Some(endpoint) => Region::Custom {
                name: region,
                endpoint,
            },
            None => region.parse::<Region>()?,
        };

        let client = match (access_key, secret_key) {
            (Some(access_key), Some(secret_key)) => S3Client::new_with(
                HttpClient::new()?,
                StaticProvider::new_minimal(access_key.to_string(), secret_key.to_string()),
                region,
            ),
            _ => S3Client::new_with(HttpClient::new()?, ChainProvider::new(), region),
        };

        Ok(Self {
            client,
            bucket,
            acl,
        })
    }
}

#[async_trait]
impl StorageBackend for BlobStorageBackend {
    fn location(&self) -> &str {
        &self.bucket
    }

    async fn store(&self, key: &str, content_type: &str, data: Bytes) -> anyhow::Result<()> {
        debug!("Storing rendition in bucket @ {}", key);

        let request = PutObjectRequest {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            body: Some(data.to_vec().into()),
            content_type: Some(content_type.to_string()),
            acl: Some(self.acl.clone()),
            ..Default::default()
        };

        self.client.put_object(request).await?;
        Ok(())
    }

    async fn fetch(&self, key: &str) -> anyhow::Result<Option<Bytes>> {
        debug!("Retrieving rendition in bucket @ {}", key);

        let request = GetObjectRequest {
            bucket: self.bucket.clone(),
            key: key.to_string(),
            ..Default::default()
        };

        match self.client.get_object(request).await {
            Ok(output) => {
                let mut buff = vec![];
                if let Some(body) = output.body {
                    body.into_async_read().read_to_end(&mut buff).await?;
                }
                Ok(Some(Bytes::from(buff)))
            }
            Err(RusotoError::Service(GetObjectError::NoSuchKey(_))) => Ok(None),
            Err(RusotoError::Unknown(resp)) if resp.status.as_u16() == 404 => Ok(None),
            Err(other) => Err(other.into()),
        }
    }

    async fn delete(&self, keys: &[String]) -> Result<(), DeleteError> {
        debug!("Purging {} rendition(s) from bucket", keys.len());

        let objects = keys
            .iter()
            .map(|key| ObjectIdentifier {
                key: key.clone(),
                version_id: None,
            })
            .collect();

        let request = DeleteObjectsRequest {
            bucket: self.bucket.clone(),
            delete: Delete {
                objects,
                quiet: Some(false),
            },
            ..Default::default()
        };

        match self.client.delete_objects(request).await {
            Ok(output) => {
                let failed: Vec<FailedDelete> = output
                    .errors
                    .unwrap_or_default()
                    .into_iter()
                    .map(|e| FailedDelete {
                        key: e.key.unwrap_or_default(),
                        reason: e
                            .message
                            .or(e.code)
                            .unwrap_or_else(|| "unknown error".to_string()),
                    })
                    .collect();

                if failed.is_empty() {
                    Ok(())
                } else {
                    Err(DeleteError { failed })
                }
            }
            // The whole batch call failed, every key is unaccounted for.
            Err(e) => Err(DeleteError {
                failed: keys
                    .iter()
                    .map(|key| FailedDelete {
                        key: key.clone(),
                        reason: e.to_string(),
                    })
                    .collect(),
            }),
        }
    }
}
