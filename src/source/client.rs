use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;

use crate::source::{FetchError, FetchResult};

const TIMEOUT_SECS: u64 = 10;

/// Shared HTTP client for source adapters.
///
/// Applies the network timeout and maps transport failures into the
/// adapter error taxonomy, so adapters only deal with their own payload
/// shapes.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(TIMEOUT_SECS))
            .gzip(true)
            .brotli(true)
            .user_agent(concat!("estuary/", env!("CARGO_PKG_VERSION")))
            .build()
            .expect("Failed to build HTTP client");

        Self { client }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> FetchResult<T> {
        let response = self.get_checked(url).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| FetchError::MalformedResponse(e.to_string()))
    }

    pub async fn get_text(&self, url: &str) -> FetchResult<String> {
        let response = self.get_checked(url).await?;
        response
            .text()
            .await
            .map_err(|e| FetchError::MalformedResponse(e.to_string()))
    }

    pub async fn get_bytes(&self, url: &str) -> FetchResult<Vec<u8>> {
        let response = self.get_checked(url).await?;
        response
            .bytes()
            .await
            .map(|b| b.to_vec())
            .map_err(|e| FetchError::MalformedResponse(e.to_string()))
    }

    async fn get_checked(&self, url: &str) -> FetchResult<reqwest::Response> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_transport_error)?;

        if !response.status().is_success() {
            return Err(FetchError::RemoteRejected(response.status().as_u16()));
        }
        Ok(response)
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

fn map_transport_error(e: reqwest::Error) -> FetchError {
    if let Some(status) = e.status() {
        FetchError::RemoteRejected(status.as_u16())
    } else if e.is_decode() || e.is_body() {
        FetchError::MalformedResponse(e.to_string())
    } else {
        // Timeouts, DNS failures, refused connections
        FetchError::NetworkUnavailable(e.to_string())
    }
}
