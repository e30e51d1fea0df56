use thiserror::Error;

/// Raised once at startup when the configuration cannot be loaded or
/// fails validation. The server never starts with a config that
/// produced one of these.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config file {path}: {reason}")]
    Load { path: String, reason: String },

    #[error("unable to parse config file: {0}")]
    Parse(String),

    #[error("config files must end in .yaml, .yml or .json, got {0:?}")]
    UnknownFormat(String),

    #[error("backend {0:?} is not supported, expected `local` or `object-store`")]
    UnknownBackend(String),

    #[error("quality must be between 0 and 100, got {0}")]
    InvalidQuality(u8),

    #[error("placeholder_width must be at least 1 pixel")]
    InvalidPlaceholderWidth,

    #[error("resize_threshold must be at least 1 pixel when set")]
    InvalidResizeThreshold,

    #[error("max_upload_size must be non-zero")]
    InvalidMaxUploadSize,

    #[error("write_timeout_secs must be non-zero")]
    InvalidWriteTimeout,

    #[error("the object-store backend requires a non-empty bucket name")]
    MissingBucket,

    #[error("the object-store backend requires a non-empty access policy (acl)")]
    MissingAccessPolicy,

    #[error("failed to initialise the storage backend: {0}")]
    BackendInit(String),
}

/// A failure of one ingestion. Terminal for the request that produced
/// it, nothing is retried automatically.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("upload of {size} bytes exceeds the configured limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("payload could not be decoded as an image: {0}")]
    Decode(#[from] image::ImageError),

    /// A rendition failed to encode or land in the backend. Carries the
    /// storage key of the rendition that failed; the sibling rendition
    /// may or may not have been written.
    #[error("failed to store rendition {key}: {source}")]
    Write { key: String, source: anyhow::Error },
}

/// One key a compensating delete could not remove.
#[derive(Debug)]
pub struct FailedDelete {
    pub key: String,
    pub reason: String,
}

/// Partial or total failure of a compensating delete. Every key that
/// could not be removed is named; the artifacts behind them are
/// orphaned until cleaned up out of band.
#[derive(Debug, Error)]
#[error("failed to delete {} storage object(s): {}", .failed.len(), describe(.failed))]
pub struct DeleteError {
    pub failed: Vec<FailedDelete>,
}

fn describe(failed: &[FailedDelete]) -> String {
    failed
        .iter()
        .map(|f| format!("{} ({})", f.key, f.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delete_error_names_every_failed_key() {
        let err = DeleteError {
            failed: vec![
                FailedDelete {
                    key: "2026/8/a.jpeg".to_string(),
                    reason: "access denied".to_string(),
                },
                FailedDelete {
                    key: "2026/8/a_placeholder.jpeg".to_string(),
                    reason: "access denied".to_string(),
                },
            ],
        };

        let msg = err.to_string();
        assert!(msg.contains("2026/8/a.jpeg"));
        assert!(msg.contains("2026/8/a_placeholder.jpeg"));
        assert!(msg.starts_with("failed to delete 2"));
    }
}
