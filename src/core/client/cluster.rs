//! Thin typed GET client for the Kubernetes API server, metrics-server and
//! kubelet proxy endpoints. Every call is a read-only idempotent GET carrying
//! the caller's bearer token verbatim; the reqwest connection pool behind it
//! is shared process-wide.

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::core::client::kube_resources::{
    CronJob, Deployment, Job, Namespace, Node, PersistentVolumeClaim, Pod, ReplicaSet, StatefulSet,
};
use crate::core::client::metrics::{NodeMetricsList, PodMetricsList};
use crate::core::client::summary_dto::Summary;

// Decode cap for upstream bodies; a pod list larger than this is a sign of
// something much worse than a truncated dashboard.
const MAX_BODY_BYTES: usize = 10 << 20;

/// Read-only cluster data surface consumed by the aggregation services.
/// A failed call means "this source is unavailable"; callers decide whether
/// that is fatal or best-effort.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>>;
    async fn list_pods_limit(&self, namespace: &str, limit: u32) -> Result<Vec<Pod>>;
    async fn list_all_pods(&self) -> Result<Vec<Pod>>;
    async fn list_deployments(&self, namespace: &str) -> Result<Vec<Deployment>>;
    async fn list_replica_sets(&self, namespace: &str) -> Result<Vec<ReplicaSet>>;
    async fn list_stateful_sets(&self, namespace: &str) -> Result<Vec<StatefulSet>>;
    async fn list_jobs(&self, namespace: &str) -> Result<Vec<Job>>;
    async fn list_cron_jobs(&self, namespace: &str) -> Result<Vec<CronJob>>;
    async fn list_pvcs(&self, namespace: &str) -> Result<Vec<PersistentVolumeClaim>>;
    async fn list_namespaces(&self) -> Result<Vec<Namespace>>;
    async fn list_nodes(&self) -> Result<Vec<Node>>;
    async fn list_pod_metrics(&self, namespace: &str) -> Result<PodMetricsList>;
    async fn list_node_metrics(&self) -> Result<NodeMetricsList>;
    async fn get_node_summary(&self, node_name: &str) -> Result<Summary>;
    async fn verify_token(&self) -> Result<()>;
}

/// Generic list envelope. We only care about `items`; apiVersion/kind and
/// list metadata are irrelevant to the aggregation.
#[derive(Debug, Deserialize)]
struct ObjectList<T> {
    #[serde(default)]
    items: Vec<T>,
}

/// Per-request client: shared pool + API server base URL + caller token.
#[derive(Clone)]
pub struct ClusterClient {
    http: reqwest::Client,
    api_server: String,
    token: String,
}

impl ClusterClient {
    pub fn new(http: reqwest::Client, api_server: String, token: String) -> Self {
        Self {
            http,
            api_server,
            token,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.api_server, path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            let detail = String::from_utf8_lossy(&body[..body.len().min(512)]).into_owned();
            bail!("kubernetes api {}: {} {}", path, status, detail);
        }
        if body.len() > MAX_BODY_BYTES {
            bail!("kubernetes api {}: response exceeds {} bytes", path, MAX_BODY_BYTES);
        }
        Ok(serde_json::from_slice(&body)?)
    }

    async fn get_items<T: DeserializeOwned + Default>(&self, path: &str) -> Result<Vec<T>> {
        let list: ObjectList<T> = self.get(path).await?;
        Ok(list.items)
    }
}

#[async_trait]
impl ClusterApi for ClusterClient {
    async fn list_pods(&self, namespace: &str) -> Result<Vec<Pod>> {
        let pods = self
            .get_items(&format!("/api/v1/namespaces/{}/pods", namespace))
            .await?;
        debug!("Discovered {} pod(s) in namespace '{}'", pods.len(), namespace);
        Ok(pods)
    }

    async fn list_pods_limit(&self, namespace: &str, limit: u32) -> Result<Vec<Pod>> {
        self.get_items(&format!(
            "/api/v1/namespaces/{}/pods?limit={}",
            namespace, limit
        ))
        .await
    }

    async fn list_all_pods(&self) -> Result<Vec<Pod>> {
        let pods = self.get_items("/api/v1/pods").await?;
        debug!("Discovered {} pod(s) cluster-wide", pods.len());
        Ok(pods)
    }

    async fn list_deployments(&self, namespace: &str) -> Result<Vec<Deployment>> {
        self.get_items(&format!(
            "/apis/apps/v1/namespaces/{}/deployments",
            namespace
        ))
        .await
    }

    async fn list_replica_sets(&self, namespace: &str) -> Result<Vec<ReplicaSet>> {
        self.get_items(&format!(
            "/apis/apps/v1/namespaces/{}/replicasets",
            namespace
        ))
        .await
    }

    async fn list_stateful_sets(&self, namespace: &str) -> Result<Vec<StatefulSet>> {
        self.get_items(&format!(
            "/apis/apps/v1/namespaces/{}/statefulsets",
            namespace
        ))
        .await
    }

    async fn list_jobs(&self, namespace: &str) -> Result<Vec<Job>> {
        self.get_items(&format!("/apis/batch/v1/namespaces/{}/jobs", namespace))
            .await
    }

    async fn list_cron_jobs(&self, namespace: &str) -> Result<Vec<CronJob>> {
        self.get_items(&format!("/apis/batch/v1/namespaces/{}/cronjobs", namespace))
            .await
    }

    async fn list_pvcs(&self, namespace: &str) -> Result<Vec<PersistentVolumeClaim>> {
        self.get_items(&format!(
            "/api/v1/namespaces/{}/persistentvolumeclaims",
            namespace
        ))
        .await
    }

    async fn list_namespaces(&self) -> Result<Vec<Namespace>> {
        let namespaces = self.get_items("/api/v1/namespaces").await?;
        debug!("Discovered {} namespace(s)", namespaces.len());
        Ok(namespaces)
    }

    async fn list_nodes(&self) -> Result<Vec<Node>> {
        let nodes = self.get_items("/api/v1/nodes").await?;
        debug!("Discovered {} node(s)", nodes.len());
        Ok(nodes)
    }

    async fn list_pod_metrics(&self, namespace: &str) -> Result<PodMetricsList> {
        self.get(&format!(
            "/apis/metrics.k8s.io/v1beta1/namespaces/{}/pods",
            namespace
        ))
        .await
    }

    async fn list_node_metrics(&self) -> Result<NodeMetricsList> {
        self.get("/apis/metrics.k8s.io/v1beta1/nodes").await
    }

    /// Kubelet stats through the API server proxy. Needs `nodes/proxy` get
    /// permission; callers treat failures as best-effort.
    async fn get_node_summary(&self, node_name: &str) -> Result<Summary> {
        let summary = self
            .get(&format!("/api/v1/nodes/{}/proxy/stats/summary", node_name))
            .await?;
        debug!("Fetched summary for node: {}", node_name);
        Ok(summary)
    }

    async fn verify_token(&self) -> Result<()> {
        // Cheapest authenticated probe: the version discovery document.
        let _: serde_json::Value = self.get("/api").await?;
        Ok(())
    }
}
