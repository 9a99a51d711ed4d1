//! Construction of the process-wide HTTP connection pool used for all
//! Kubernetes API traffic. Built once at startup and injected through
//! `AppState`; per-request identity (the caller's bearer token) is attached
//! by [`ClusterClient`](super::cluster::ClusterClient), never stored here.

use std::time::Duration;

use anyhow::Result;
use tracing::warn;

use crate::config::Settings;

const KUBE_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
const IDLE_POOL_TIMEOUT: Duration = Duration::from_secs(90);
const MAX_IDLE_PER_HOST: usize = 20;

/// Build the shared reqwest client for API server traffic.
pub fn build_kube_http(settings: &Settings) -> Result<reqwest::Client> {
    if settings.insecure_tls {
        warn!("TLS verification disabled (KUBE_INSECURE_TLS=true)");
    }

    let client = reqwest::Client::builder()
        .timeout(KUBE_REQUEST_TIMEOUT)
        .pool_idle_timeout(IDLE_POOL_TIMEOUT)
        .pool_max_idle_per_host(MAX_IDLE_PER_HOST)
        .danger_accept_invalid_certs(settings.insecure_tls)
        .build()?;

    Ok(client)
}
