//! HTTP reachability probe.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use sitecap_core::{ConnectivityProbe, StaticConnectivity};
use sitecap_domain::{NetworkConfig, Result};
use tracing::debug;

use crate::errors::{to_domain, InfraError};

/// Sends a `HEAD` request to a fixed URL. Any HTTP response, whatever the
/// status, means the device is online; transport errors and timeouts mean
/// offline.
#[derive(Clone)]
pub struct HttpConnectivityProbe {
    client: ReqwestClient,
    url: String,
}

impl HttpConnectivityProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(to_domain)?;
        Ok(Self { client, url: url.into() })
    }

    pub fn from_config(config: &NetworkConfig) -> Result<Self> {
        Self::new(config.probe_url.clone(), config.timeout())
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ConnectivityProbe for HttpConnectivityProbe {
    async fn is_connected(&self) -> bool {
        match self.client.head(&self.url).send().await {
            Ok(response) => {
                debug!(url = %self.url, status = %response.status(), "Connectivity probe answered");
                true
            }
            Err(err) => {
                let reason = InfraError::from(err).0;
                debug!(url = %self.url, error = %reason, "Connectivity probe failed");
                false
            }
        }
    }
}

/// Probe for the configured network settings. With checks disabled the
/// device is always treated as online.
pub fn probe_from_config(config: &NetworkConfig) -> Result<Arc<dyn ConnectivityProbe>> {
    if !config.check_enabled {
        debug!("Network check disabled; treating device as online");
        return Ok(Arc::new(StaticConnectivity::online()));
    }

    Ok(Arc::new(HttpConnectivityProbe::from_config(config)?))
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    async fn server_answering(status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/generate_204"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
        server
    }

    fn probe_for(server: &MockServer, timeout: Duration) -> HttpConnectivityProbe {
        HttpConnectivityProbe::new(format!("{}/generate_204", server.uri()), timeout).unwrap()
    }

    #[tokio::test]
    async fn no_content_means_connected() {
        let server = server_answering(204).await;
        assert!(probe_for(&server, Duration::from_secs(2)).is_connected().await);
    }

    #[tokio::test]
    async fn server_error_still_means_connected() {
        let server = server_answering(503).await;
        assert!(probe_for(&server, Duration::from_secs(2)).is_connected().await);
    }

    #[tokio::test]
    async fn slow_response_means_offline() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(204).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        assert!(!probe_for(&server, Duration::from_millis(50)).is_connected().await);
    }

    #[tokio::test]
    async fn refused_connection_means_offline() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let probe =
            HttpConnectivityProbe::new(format!("http://{addr}/generate_204"), Duration::from_secs(1))
                .unwrap();

        assert!(!probe.is_connected().await);
    }

    #[tokio::test]
    async fn disabled_check_is_always_online() {
        let config = NetworkConfig {
            check_enabled: false,
            probe_url: "http://127.0.0.1:9/unused".into(),
            ..NetworkConfig::default()
        };

        let probe = probe_from_config(&config).unwrap();

        assert!(probe.is_connected().await);
    }
}
