use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{DeleteError, FailedDelete};
use crate::StorageBackend;

pub struct FileSystemBackend {
    directory: PathBuf,
    location: String,
}

impl FileSystemBackend {
    /// Opens the backend rooted at `dir`, creating the directory if it
    /// does not exist yet.
    pub async fn connect(dir: PathBuf) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&dir).await?;

        let location = dir.display().to_string();
        Ok(Self {
            directory: dir,
            location,
        })
    }

    #[inline]
    fn resolve(&self, key: &str) -> PathBuf {
        self.directory.join(key)
    }
}

#[async_trait]
impl StorageBackend for FileSystemBackend {
    fn location(&self) -> &str {
        &self.location
    }

    async fn store(&self, key: &str, _content_type: &str, data: Bytes) -> anyhow::Result<()> {
        let path = self.resolve(key);

        debug!("Storing rendition @ {:?}", &path);
        match tokio::fs::write(&path, &data).await {
            Ok(()) => Ok(()),
            Err(ref e) if e.kind() == ErrorKind::NotFound => {
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                tokio::fs::write(&path, data).await?;
                Ok(())
            }
            Err(other) => Err(other.into()),
        }
    }

    async fn fetch(&self, key: &str) -> anyhow::Result<Option<Bytes>> {
        let path = self.resolve(key);

        debug!("Retrieving rendition @ {:?}", &path);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(ref e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(other) => Err(other.into()),
        }
    }

    async fn delete(&self, keys: &[String]) -> Result<(), DeleteError> {
        let mut failed = vec![];

        for key in keys {
            let path = self.resolve(key);
            debug!("Purging rendition @ {:?}", &path);

            match tokio::fs::remove_file(&path).await {
                Ok(()) => continue,
                // Already gone counts as deleted.
                Err(ref e) if e.kind() == ErrorKind::NotFound => continue,
                Err(other) => failed.push(FailedDelete {
                    key: key.clone(),
                    reason: other.to_string(),
                }),
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(DeleteError { failed })
        }
    }
}
