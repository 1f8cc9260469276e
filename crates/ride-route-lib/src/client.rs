//! HTTP implementation of [`RoutingService`]

use crate::compat;
use crate::nodes::Node;
use crate::plans::ModePlans;
use crate::service::{HealthStatus, NodeListing, NodeRecord, PathRequest, RoutingService};
use crate::utils::LatLon;
use crate::{Result, RouteError};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Where the routing service lives and how long to wait for it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// API root, e.g. `http://localhost:5001/api`
    pub base_url: String,
    /// Per-request timeout. Default: 15 s
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5001/api".to_string(),
            timeout: Duration::from_secs(15),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// `reqwest`-backed routing client
#[derive(Debug, Clone)]
pub struct HttpRoutingClient {
    config: ClientConfig,
    client: reqwest::Client,
}

impl HttpRoutingClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, client })
    }

    #[inline]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.config.endpoint(path);
        tracing::debug!("GET {url}");
        let response = self.client.get(&url).send().await?;
        Self::decode(&url, response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.config.endpoint(path);
        tracing::debug!("POST {url}");
        let response = self.client.post(&url).json(body).send().await?;
        Self::decode(&url, response).await
    }

    async fn decode<T: DeserializeOwned>(url: &str, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            tracing::warn!("{url} returned {status}");
            return Err(RouteError::Status {
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|err| RouteError::Malformed(err.to_string()))
    }
}

impl RoutingService for HttpRoutingClient {
    async fn fetch_nodes(&self) -> Result<Vec<Node>> {
        let listing: NodeListing = self.get_json("nodes").await?;
        if let Some(count) = listing.count
            && count != listing.nodes.len()
        {
            tracing::warn!(
                "Node listing reports {count} nodes but contains {}",
                listing.nodes.len()
            );
        }
        Ok(listing.nodes.into_iter().map(NodeRecord::into_node).collect())
    }

    async fn fetch_segment(&self, start: &Node, goal: &Node) -> Result<Vec<LatLon>> {
        let body: serde_json::Value = self
            .post_json("find-path", &PathRequest::between(start, goal))
            .await?;
        compat::segment_coordinates(&body)
    }

    async fn fetch_mode_plans(&self, start: &Node, goal: &Node) -> Result<ModePlans> {
        let body: serde_json::Value = self
            .post_json("find-path-modes", &PathRequest::between(start, goal))
            .await?;
        ModePlans::from_wire(&body)
    }

    async fn health(&self) -> Result<HealthStatus> {
        self.get_json("health").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_paths() {
        let config = ClientConfig::new("http://routing.local/api/");
        assert_eq!(config.endpoint("find-path"), "http://routing.local/api/find-path");
        assert_eq!(
            ClientConfig::default().endpoint("nodes"),
            "http://localhost:5001/api/nodes"
        );
    }

    #[test]
    fn test_client_builds() {
        let client = HttpRoutingClient::new(ClientConfig::default()).unwrap();
        assert_eq!(client.config().timeout, Duration::from_secs(15));
    }
}
