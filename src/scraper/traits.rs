use crate::model::{FetchError, IdentifyError};

/// Downloads the bytes of an uploaded photo.
#[async_trait::async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Sends a photo to the label identification service and returns its raw answer.
#[async_trait::async_trait]
pub trait Identifier: Send + Sync {
    async fn identify(&self, image: &[u8]) -> Result<String, IdentifyError>;
}
