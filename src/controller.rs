use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use image::GenericImageView;
use tokio::task;

use crate::config::ProcessingConfig;
use crate::error::{DeleteError, IngestError};
use crate::keys::{self, KeyPair};
use crate::processor::{encoder, planner};
use crate::StorageBackend;

/// The aggregated result of one successful ingestion. Constructed only
/// once both renditions have durably landed in the backend.
#[derive(Debug, Clone)]
pub struct StoredImage {
    pub mimetype: mime::Mime,
    pub keys: KeyPair,
    pub location: String,
}

/// Orchestrates one ingestion: buffer, decode, plan, encode both
/// renditions, write both through the backend, join the writes into a
/// single outcome.
///
/// The engine itself only holds shared read-only state. Everything
/// belonging to one in-flight request (the derived key pair, the
/// pending writes) lives in the `ingest` call that created it, so
/// concurrent ingestions can never observe each other's keys.
pub struct StorageEngine {
    processing: ProcessingConfig,
    max_upload_size: usize,
    write_timeout: Duration,
    backend: Arc<dyn StorageBackend>,
}

impl StorageEngine {
    pub fn new(
        processing: ProcessingConfig,
        max_upload_size: usize,
        backend: Arc<dyn StorageBackend>,
    ) -> Self {
        let write_timeout = Duration::from_secs(processing.write_timeout_secs);

        Self {
            processing,
            max_upload_size,
            write_timeout,
            backend,
        }
    }

    /// The content type every stored rendition is encoded with.
    pub fn content_type(&self) -> mime::Mime {
        self.processing.output_format.as_content_type()
    }

    /// Ingests one upload and stores both derived renditions.
    ///
    /// Returns exactly one outcome per call: either a `StoredImage`
    /// once both writes have settled successfully, or the first error
    /// observed. A failed ingestion does not clean up a sibling
    /// rendition that already landed; callers roll that back explicitly
    /// via [`StorageEngine::remove`].
    pub async fn ingest(
        &self,
        original_filename: Option<&str>,
        data: Bytes,
    ) -> Result<StoredImage, IngestError> {
        if data.len() > self.max_upload_size {
            return Err(IngestError::PayloadTooLarge {
                size: data.len(),
                limit: self.max_upload_size,
            });
        }

        let processing = self.processing.clone();
        let filename = original_filename.map(String::from);

        // Decode and encode are CPU bound, keep them off the runtime
        // workers.
        let (pair, renditions) = task::spawn_blocking(move || {
            let mut img = image::load_from_memory(&data)?;

            if processing.greyscale {
                img = img.grayscale();
            }

            let (width, height) = img.dimensions();
            let plan = planner::plan(width, height, &processing);
            debug!(
                "Planned renditions for {}x{} upload: original {}x{}, placeholder {}x{}",
                width,
                height,
                plan.original.width,
                plan.original.height,
                plan.placeholder.width,
                plan.placeholder.height,
            );

            let pair = keys::derive_key_pair(
                filename.as_deref(),
                processing.output_format.as_file_extension(),
            );

            match encoder::encode_plan(img, plan) {
                Ok(renditions) => Ok((pair, renditions)),
                Err((role, e)) => Err(IngestError::Write {
                    key: pair.key_for(role).to_string(),
                    source: e,
                }),
            }
        })
        .await
        .expect("image processing worker panicked")?;

        // Both writes are one logical transaction: fan out, wait for
        // both to settle, then report a single outcome carrying the
        // first error observed.
        let writes = renditions.into_iter().map(|rendition| {
            let key = pair.key_for(rendition.role).to_string();
            self.write_rendition(key, rendition.buff)
        });
        let outcomes = futures::future::join_all(writes).await;
        for outcome in outcomes {
            outcome?;
        }

        info!(
            "Stored image as {} with placeholder {}",
            pair.original, pair.placeholder,
        );

        Ok(StoredImage {
            mimetype: self.content_type(),
            keys: pair,
            location: self.backend.location().to_string(),
        })
    }

    /// Compensating delete for the artifacts of one earlier ingestion.
    ///
    /// Invoked by the caller when a later step of its own request fails
    /// after the image already landed; the engine's success path never
    /// calls this. Removes both keys regardless of which of the two
    /// actually got written.
    pub async fn remove(&self, keys: &KeyPair) -> Result<(), DeleteError> {
        let targets = [keys.original.clone(), keys.placeholder.clone()];

        debug!("Rolling back renditions {:?}", &targets);
        self.backend.delete(&targets).await
    }

    /// Reads one stored rendition back through the backend.
    pub async fn fetch(&self, key: &str) -> anyhow::Result<Option<Bytes>> {
        self.backend.fetch(key).await
    }

    async fn write_rendition(&self, key: String, data: Bytes) -> Result<(), IngestError> {
        let content_type = self.content_type();
        let write = self.backend.store(&key, content_type.as_ref(), data);

        match tokio::time::timeout(self.write_timeout, write).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(IngestError::Write { key, source: e }),
            Err(_) => Err(IngestError::Write {
                key,
                source: anyhow::anyhow!(
                    "backend write timed out after {}s",
                    self.write_timeout.as_secs()
                ),
            }),
        }
    }
}
