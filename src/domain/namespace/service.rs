//! Namespace listing for the dashboard's namespace picker. Only namespaces
//! that actually contain pods are shown; the per-namespace probe asks for at
//! most one pod and a failed probe skips that namespace rather than failing
//! the request.

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::warn;

use crate::core::client::cluster::ClusterApi;

const PROBE_CONCURRENCY: usize = 10;

#[derive(Debug, Clone, Serialize)]
pub struct NamespaceItem {
    pub name: String,
}

pub async fn list_active_namespaces(api: &dyn ClusterApi) -> Result<Vec<NamespaceItem>> {
    let namespaces = api
        .list_namespaces()
        .await
        .context("listing namespaces")?;

    let names: Vec<String> = namespaces
        .into_iter()
        .filter_map(|ns| ns.metadata.name)
        .collect();

    let mut items: Vec<NamespaceItem> = stream::iter(names)
        .map(|name| async move {
            match api.list_pods_limit(&name, 1).await {
                Ok(pods) if !pods.is_empty() => Some(NamespaceItem { name }),
                Ok(_) => None,
                Err(err) => {
                    warn!("failed to check pods in {}: {:#}", name, err);
                    None
                }
            }
        })
        .buffer_unordered(PROBE_CONCURRENCY)
        .collect::<Vec<_>>()
        .await
        .into_iter()
        .flatten()
        .collect();

    items.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(items)
}

#[cfg(test)]
mod tests {
    use k8s_openapi::api::core::v1::{Namespace, Pod};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    use crate::core::client::cluster::mock::MockCluster;

    use super::*;

    fn namespace(name: &str) -> Namespace {
        Namespace {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn pod_in(namespace: &str) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(format!("{}-pod", namespace)),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn returns_only_namespaces_with_pods_sorted() {
        let mut cluster = MockCluster::default();
        cluster.namespaces = Some(vec![
            namespace("zeta"),
            namespace("alpha"),
            namespace("empty"),
        ]);
        cluster.pods = Some(vec![pod_in("zeta"), pod_in("alpha")]);

        let items = list_active_namespaces(&cluster).await.unwrap();
        let names: Vec<_> = items.into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[tokio::test]
    async fn probe_failure_skips_the_namespace() {
        let mut cluster = MockCluster::default();
        cluster.namespaces = Some(vec![namespace("ok"), namespace("denied")]);
        cluster.pods = Some(vec![pod_in("ok"), pod_in("denied")]);
        cluster.failing_namespaces = vec!["denied".to_string()];

        let items = list_active_namespaces(&cluster).await.unwrap();
        let names: Vec<_> = items.into_iter().map(|i| i.name).collect();
        assert_eq!(names, vec!["ok"]);
    }

    #[tokio::test]
    async fn namespace_list_failure_aborts() {
        let mut cluster = MockCluster::default();
        cluster.namespaces = None;
        assert!(list_active_namespaces(&cluster).await.is_err());
    }
}
