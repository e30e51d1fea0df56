use std::sync::Arc;

use bytes::Bytes;
use poem::http::StatusCode;
use poem::web::{Data, Path};
use poem::{handler, Response};
use poem_openapi::payload::{Json, PlainText};
use poem_openapi::types::multipart::Upload;
use poem_openapi::{ApiResponse, Multipart, Object, OpenApi};

use crate::controller::StorageEngine;
use crate::error::IngestError;

pub struct PicstoreApi {
    pub engine: Arc<StorageEngine>,
}

#[derive(Debug, Multipart)]
pub struct UploadPayload {
    /// The image to ingest.
    photo: Upload,
}

#[derive(Debug, Object)]
pub struct UploadedImage {
    /// The content type both stored renditions were encoded with.
    pub mimetype: String,

    /// The filename the client attached to the upload, if any.
    pub original_filename: Option<String>,

    /// The storage key of the full-size rendition.
    pub original_key: String,

    /// The storage key of the low-resolution placeholder rendition.
    pub placeholder_key: String,

    /// The bucket or root directory the renditions were written to.
    pub location: String,
}

#[derive(ApiResponse)]
pub enum UploadOutcome {
    /// Both renditions landed durably in the storage backend.
    #[oai(status = 200)]
    Uploaded(Json<UploadedImage>),

    /// The payload was not a decodable image.
    #[oai(status = 400)]
    InvalidImage(PlainText<String>),

    /// The payload exceeded the configured upload limit.
    #[oai(status = 413)]
    TooLarge(PlainText<String>),

    /// A backend write failed, the upload should be retried.
    #[oai(status = 500)]
    StoreFailed(PlainText<String>),
}

#[OpenApi]
impl PicstoreApi {
    /// Upload an image
    ///
    /// Stores a normalized original rendition and a small blur-up
    /// placeholder rendition, and returns the keys of both.
    #[oai(path = "/upload", method = "post")]
    pub async fn upload(&self, payload: UploadPayload) -> UploadOutcome {
        let filename = payload.photo.file_name().map(String::from);

        let data = match payload.photo.into_vec().await {
            Ok(data) => Bytes::from(data),
            Err(e) => {
                debug!("Rejecting unreadable multipart payload: {}", e);
                return UploadOutcome::InvalidImage(PlainText(
                    "upload payload could not be read".to_string(),
                ));
            }
        };

        match self.engine.ingest(filename.as_deref(), data).await {
            Ok(stored) => UploadOutcome::Uploaded(Json(UploadedImage {
                mimetype: stored.mimetype.to_string(),
                original_filename: filename,
                original_key: stored.keys.original,
                placeholder_key: stored.keys.placeholder,
                location: stored.location,
            })),
            Err(e @ IngestError::PayloadTooLarge { .. }) => {
                debug!("Rejecting oversized upload: {}", e);
                UploadOutcome::TooLarge(PlainText(e.to_string()))
            }
            Err(e @ IngestError::Decode(_)) => {
                debug!("Rejecting undecodable upload: {}", e);
                UploadOutcome::InvalidImage(PlainText(
                    "upload payload is not a supported image".to_string(),
                ))
            }
            Err(e @ IngestError::Write { .. }) => {
                error!("Failed to store upload: {}", e);
                UploadOutcome::StoreFailed(PlainText("failed to store image".to_string()))
            }
        }
    }
}

/// Streams a stored rendition back through the active backend.
///
/// Serves both deployment modes: local files and object-store blobs go
/// through the same adapter fetch.
#[handler]
pub async fn fetch_media(
    Path((year, month, key)): Path<(i32, u32, String)>,
    Data(engine): Data<&Arc<StorageEngine>>,
) -> poem::Result<Response> {
    if key.contains("..") || key.contains('/') {
        return Err(poem::Error::from_status(StatusCode::BAD_REQUEST));
    }

    let storage_key = format!("{}/{}/{}", year, month, key);
    match engine.fetch(&storage_key).await {
        Ok(Some(data)) => {
            let content_type = engine.content_type();
            Ok(Response::builder()
                .content_type(content_type.as_ref())
                .body(data))
        }
        Ok(None) => Err(poem::Error::from_status(StatusCode::BAD_REQUEST)),
        Err(e) => {
            error!("Failed to fetch {}: {}", storage_key, e);
            Err(poem::Error::from_status(StatusCode::INTERNAL_SERVER_ERROR))
        }
    }
}
