use crate::error::{InputError, Result};
use std::path::Path;

/// Raw bytes of a single uploaded image, checked against the upload limit.
#[derive(Debug)]
pub struct ImagePayload {
    bytes: Vec<u8>,
}

impl ImagePayload {
    pub fn new(bytes: Vec<u8>, limit: usize) -> std::result::Result<Self, InputError> {
        if bytes.is_empty() {
            return Err(InputError::Missing);
        }
        if bytes.len() > limit {
            return Err(InputError::TooLarge {
                size: bytes.len(),
                limit,
            });
        }
        Ok(Self { bytes })
    }

    /// Reads the whole file up front; the handle is closed before this returns.
    pub async fn from_file(path: impl AsRef<Path>, limit: usize) -> Result<Self> {
        let path = path.as_ref();
        let size = tokio::fs::metadata(path)
            .await
            .map_err(InputError::from)?
            .len() as usize;
        if size > limit {
            return Err(InputError::TooLarge { size, limit }.into());
        }
        let bytes = tokio::fs::read(path).await.map_err(InputError::from)?;
        Ok(Self::new(bytes, limit)?)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
