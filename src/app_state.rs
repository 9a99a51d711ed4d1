use std::sync::Arc;

use anyhow::Result;

use crate::config::Settings;
use crate::core::client::cluster::ClusterClient;
use crate::core::client::http::build_kube_http;
use crate::core::client::prometheus::PrometheusClient;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    /// Process-wide connection pool for API server traffic; identity is
    /// attached per request via [`AppState::cluster`].
    pub kube_http: reqwest::Client,
    pub prometheus: Option<Arc<PrometheusClient>>,
}

pub fn build_app_state(settings: Settings) -> Result<AppState> {
    let kube_http = build_kube_http(&settings)?;
    let prometheus = settings
        .prometheus_url
        .as_deref()
        .map(PrometheusClient::new)
        .transpose()?
        .map(Arc::new);

    Ok(AppState {
        settings: Arc::new(settings),
        kube_http,
        prometheus,
    })
}

impl AppState {
    /// Cluster client acting with the caller's bearer token.
    pub fn cluster(&self, token: &str) -> ClusterClient {
        ClusterClient::new(
            self.kube_http.clone(),
            self.settings.api_server.clone(),
            token.to_string(),
        )
    }

    pub fn prometheus_available(&self) -> bool {
        self.prometheus.is_some()
    }
}
