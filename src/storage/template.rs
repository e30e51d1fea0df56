use async_trait::async_trait;
use bytes::Bytes;

use crate::error::DeleteError;

/// The capability set every storage backend provides.
///
/// Backends are interchangeable from the engine's point of view, the
/// active one is selected exactly once at startup. Adapters hold no
/// per-request state and are shared read-only across all in-flight
/// ingestions.
#[async_trait]
pub trait StorageBackend: Sync + Send + 'static {
    /// The bucket name or root directory writes land in, echoed back
    /// to clients so they can address the stored renditions.
    fn location(&self) -> &str;

    /// Durably writes one named blob.
    async fn store(&self, key: &str, content_type: &str, data: Bytes) -> anyhow::Result<()>;

    /// Reads one blob back, `None` if the key does not exist.
    async fn fetch(&self, key: &str) -> anyhow::Result<Option<Bytes>>;

    /// Removes a set of keys. Keys that do not exist are not an error;
    /// keys that exist but cannot be removed are reported by name.
    async fn delete(&self, keys: &[String]) -> Result<(), DeleteError>;
}
