use crate::model::IdentifyError;
use crate::scraper::traits::Identifier;

use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

/// Client for an HTTP label identification endpoint.
/// The endpoint takes the raw image as the request body and answers with
/// the detection JSON, possibly wrapped in a Markdown fence.
pub struct HttpIdentifier {
    client: Client,
    url: String,
    api_key: String,
    timeout: Duration,
}

impl HttpIdentifier {
    pub fn new(url: String, api_key: String, timeout: Duration) -> Result<Self, IdentifyError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IdentifyError::Http(e.to_string()))?;

        Ok(Self {
            client,
            url,
            api_key,
            timeout,
        })
    }

    /// Reads the API key from the environment variable named `key_env`.
    pub fn from_env(url: String, key_env: &str, timeout: Duration) -> Result<Self, IdentifyError> {
        let api_key =
            std::env::var(key_env).map_err(|_| IdentifyError::MissingApiKey(key_env.to_string()))?;
        Self::new(url, api_key, timeout)
    }

    async fn send(&self, image: &[u8]) -> Result<String, IdentifyError> {
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(image.to_vec())
            .send()
            .await
            .map_err(map_reqwest)?;

        if !response.status().is_success() {
            return Err(IdentifyError::Status(response.status().as_u16()));
        }

        response.text().await.map_err(map_reqwest)
    }
}

fn map_reqwest(e: reqwest::Error) -> IdentifyError {
    if e.is_timeout() {
        IdentifyError::Timeout
    } else {
        IdentifyError::Http(e.to_string())
    }
}

#[async_trait::async_trait]
impl Identifier for HttpIdentifier {
    async fn identify(&self, image: &[u8]) -> Result<String, IdentifyError> {
        debug!("Identifying labels in {} byte image", image.len());
        tokio::time::timeout(self.timeout, self.send(image))
            .await
            .map_err(|_| IdentifyError::Timeout)?
    }
}
