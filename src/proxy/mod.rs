use async_trait::async_trait;
use chrono::Utc;
use reqwest::Url;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

use crate::web::error::AppError;

pub mod cache;
pub mod sigv4;

use cache::ResponseCache;
use sigv4::{AwsCredentials, SigV4Signer};

/// Outbound leg of the forwarding proxy. Split out as a trait so the
/// caching behavior is testable without a network.
#[async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn fetch_json(&self, url: &str) -> Result<Value, AppError>;
}

/// The production upstream: SigV4-signed GETs via a shared reqwest client.
pub struct SignedHttpClient {
    client: reqwest::Client,
    signer: SigV4Signer,
}

impl SignedHttpClient {
    pub fn new(client: reqwest::Client, credentials: AwsCredentials) -> Self {
        Self {
            client,
            signer: SigV4Signer::new(credentials),
        }
    }
}

#[async_trait]
impl UpstreamClient for SignedHttpClient {
    async fn fetch_json(&self, url: &str) -> Result<Value, AppError> {
        let parsed = Url::parse(url)
            .map_err(|e| AppError::InvalidInput(format!("invalid target URL {url}: {e}")))?;
        let signed = self.signer.sign_get(&parsed, Utc::now())?;

        let response = self
            .client
            .get(parsed)
            .header("x-amz-date", &signed.amz_date)
            .header("authorization", &signed.authorization)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| AppError::MalformedResponse(e.to_string()))
    }
}

/// Rewrites an inbound local URL to its TwinMaker counterpart.
///
/// `localhost:<listen_port>` becomes `iottwinmaker.<region>.amazonaws.com`
/// and the scheme switches to https. Path, query parameters, their order
/// and their encoding pass through byte-for-byte; the TwinMaker API routes
/// on them exactly as received.
pub fn rewrite_url(inbound_url: &str, listen_port: u16, region: &str) -> String {
    let target_domain = format!("iottwinmaker.{region}.amazonaws.com");
    inbound_url
        .replace(&format!("localhost:{listen_port}"), &target_domain)
        .replace("http://", "https://")
}

/// Makes the cloud TwinMaker API reachable through a local address, with
/// request signing and per-URL response caching.
pub struct ForwardingProxy {
    upstream: Arc<dyn UpstreamClient>,
    cache: ResponseCache,
    region: String,
    listen_port: u16,
}

impl ForwardingProxy {
    pub fn new(
        upstream: Arc<dyn UpstreamClient>,
        cache: ResponseCache,
        region: String,
        listen_port: u16,
    ) -> Self {
        Self {
            upstream,
            cache,
            region,
            listen_port,
        }
    }

    /// Forwards the inbound request identified by `path_and_query` to the
    /// TwinMaker API and returns the decoded JSON body.
    ///
    /// Responses are cached by exact target URL string; a hit skips the
    /// outbound call entirely. Concurrent misses for the same URL may each
    /// fetch and each store (last write wins).
    pub async fn request_api(&self, path_and_query: &str) -> Result<Value, AppError> {
        let inbound_url = format!("http://localhost:{}{}", self.listen_port, path_and_query);
        let target_url = rewrite_url(&inbound_url, self.listen_port, &self.region);

        if let Some(hit) = self.cache.get(&target_url) {
            debug!(url = %target_url, "proxy cache hit");
            return Ok(hit);
        }

        debug!(url = %target_url, "forwarding to TwinMaker");
        let value = self.upstream.fetch_json(&target_url).await?;
        self.cache.insert(target_url, value.clone());
        Ok(value)
    }
}
