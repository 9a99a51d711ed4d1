//! Per-namespace workload aggregation.
//!
//! One required fetch (pods) gates the request; the seven auxiliary sources
//! are fetched concurrently with only deployments required; everything else
//! degrades to "absent" on failure. Kubelet summaries are fetched once per
//! distinct node with bounded concurrency, each task returning its own
//! partial map that is merged sequentially afterwards, so there is no shared
//! mutable state to lock.

use std::collections::{BTreeSet, HashMap};

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use tracing::debug;

use crate::core::client::cluster::ClusterApi;
use crate::core::client::kube_resources::{PersistentVolumeClaim, Pod};
use crate::core::client::metrics::PodMetricsList;
use crate::domain::best_effort;
use crate::domain::workload::model::{
    DeploymentDetail, ResourceKind, ResourcePair, ResourceValue, WorkloadKey, WorkloadKind,
    WorkloadResponse,
};
use crate::domain::workload::ownership::resolve_ownership;
use crate::domain::workload::pods::{build_pod_details, MetricsIndex};
use crate::domain::workload::storage::{collect_pod_storage, PodStorageStats};

// cap on simultaneous kubelet /stats/summary calls
const KUBELET_CONCURRENCY: usize = 5;

pub async fn build_workload_response(
    api: &dyn ClusterApi,
    namespace: &str,
    prometheus_available: bool,
) -> Result<WorkloadResponse> {
    // 1. Pods gate everything else.
    let pods = api
        .list_pods(namespace)
        .await
        .with_context(|| format!("listing pods in {}", namespace))?;

    // 2. Workload objects and auxiliary sources, all in one concurrent round.
    //    Deployments are required: their failure cancels the in-flight
    //    siblings and aborts the request. The rest resolve to None.
    let (deployments, stateful_sets, cron_jobs, replica_sets, jobs, pod_metrics, pvcs) =
        tokio::try_join!(
            api.list_deployments(namespace),
            best_effort("statefulsets", api.list_stateful_sets(namespace)),
            best_effort("cronjobs", api.list_cron_jobs(namespace)),
            best_effort("replicasets", api.list_replica_sets(namespace)),
            best_effort("jobs", api.list_jobs(namespace)),
            best_effort("pod metrics", api.list_pod_metrics(namespace)),
            best_effort("pvcs", api.list_pvcs(namespace)),
        )
        .with_context(|| format!("listing workloads in {}", namespace))?;

    // 3. Pod → workload ownership.
    let pod_to_workload = resolve_ownership(&pods, replica_sets.as_deref(), jobs.as_deref());

    // 4. Live usage index. "Available" tracks whether the fetch itself
    //    succeeded, not whether any given container had data.
    let metrics_available = pod_metrics.is_some();
    let metrics_index = build_metrics_index(pod_metrics.as_ref());

    // 5. Kubelet storage stats, one summary per distinct node.
    let storage_stats = fetch_storage_stats(api, namespace, &pods).await;

    // 6. PVC lookup by claim name.
    let pvc_index: HashMap<String, PersistentVolumeClaim> = pvcs
        .unwrap_or_default()
        .into_iter()
        .filter_map(|pvc| pvc.metadata.name.clone().map(|name| (name, pvc)))
        .collect();

    // 7. Group pods under their resolved workload.
    let mut pods_by_workload: HashMap<WorkloadKey, Vec<&Pod>> = HashMap::new();
    for pod in &pods {
        let Some(name) = pod.metadata.name.as_deref() else {
            continue;
        };
        if let Some(key) = pod_to_workload.get(name) {
            pods_by_workload.entry(key.clone()).or_default().push(pod);
        }
    }

    // 8. Emit one entry per workload object, pods or not.
    let mut workloads = Vec::new();

    for deployment in &deployments {
        let name = deployment.metadata.name.clone().unwrap_or_default();
        let key = WorkloadKey {
            kind: WorkloadKind::Deployment,
            name: name.clone(),
        };
        let group = pods_by_workload.get(&key).map(Vec::as_slice).unwrap_or(&[]);
        workloads.push(DeploymentDetail {
            kind: WorkloadKind::Deployment,
            name,
            namespace: deployment
                .metadata
                .namespace
                .clone()
                .unwrap_or_else(|| namespace.to_string()),
            replicas: deployment.spec.as_ref().and_then(|s| s.replicas).unwrap_or(0),
            ready_replicas: deployment
                .status
                .as_ref()
                .and_then(|s| s.ready_replicas)
                .unwrap_or(0),
            available_replicas: deployment
                .status
                .as_ref()
                .and_then(|s| s.available_replicas)
                .unwrap_or(0),
            pods: build_pod_details(group, &metrics_index, &storage_stats, &pvc_index),
        });
    }

    for stateful_set in stateful_sets.iter().flatten() {
        let name = stateful_set.metadata.name.clone().unwrap_or_default();
        let key = WorkloadKey {
            kind: WorkloadKind::StatefulSet,
            name: name.clone(),
        };
        let group = pods_by_workload.get(&key).map(Vec::as_slice).unwrap_or(&[]);
        let status = stateful_set.status.as_ref();
        // a freshly rolled StatefulSet reports 0 availableReplicas while
        // currentReplicas already tracks reality; prefer the latter then
        let mut available = status.and_then(|s| s.available_replicas).unwrap_or(0);
        if available == 0 {
            available = status.and_then(|s| s.current_replicas).unwrap_or(0);
        }
        workloads.push(DeploymentDetail {
            kind: WorkloadKind::StatefulSet,
            name,
            namespace: namespace.to_string(),
            replicas: stateful_set
                .spec
                .as_ref()
                .and_then(|s| s.replicas)
                .unwrap_or(0),
            ready_replicas: status.and_then(|s| s.ready_replicas).unwrap_or(0),
            available_replicas: available,
            pods: build_pod_details(group, &metrics_index, &storage_stats, &pvc_index),
        });
    }

    for cron_job in cron_jobs.iter().flatten() {
        let name = cron_job.metadata.name.clone().unwrap_or_default();
        let key = WorkloadKey {
            kind: WorkloadKind::CronJob,
            name: name.clone(),
        };
        let group = pods_by_workload.get(&key).map(Vec::as_slice).unwrap_or(&[]);
        // CronJobs have no replica concept; the count of currently-active
        // Jobs stands in for all three fields
        let active = cron_job
            .status
            .as_ref()
            .and_then(|s| s.active.as_ref())
            .map(|a| a.len())
            .unwrap_or(0) as i32;
        workloads.push(DeploymentDetail {
            kind: WorkloadKind::CronJob,
            name,
            namespace: namespace.to_string(),
            replicas: active,
            ready_replicas: active,
            available_replicas: active,
            pods: build_pod_details(group, &metrics_index, &storage_stats, &pvc_index),
        });
    }

    Ok(WorkloadResponse {
        workloads,
        metrics_available,
        prometheus_available,
    })
}

fn build_metrics_index(pod_metrics: Option<&PodMetricsList>) -> MetricsIndex {
    let mut index = MetricsIndex::new();
    for pod in pod_metrics.map(|l| l.items.as_slice()).unwrap_or_default() {
        let Some(pod_name) = pod.metadata.name.clone() else {
            continue;
        };
        let containers = pod
            .containers
            .iter()
            .map(|container| {
                let usage = &container.usage;
                let raw = |kind: ResourceKind| {
                    usage
                        .get(kind.as_str())
                        .map(|q| q.0.as_str())
                        .unwrap_or("")
                };
                (
                    container.name.clone(),
                    ResourcePair {
                        cpu: ResourceValue::cpu(raw(ResourceKind::Cpu)),
                        memory: ResourceValue::memory(raw(ResourceKind::Memory)),
                    },
                )
            })
            .collect();
        index.insert(pod_name, containers);
    }
    index
}

/// Fetches one kubelet summary per distinct node hosting a pod from this
/// namespace, at most [`KUBELET_CONCURRENCY`] in flight. Every failure is
/// swallowed: that node's pods simply end up with no storage data.
async fn fetch_storage_stats(
    api: &dyn ClusterApi,
    namespace: &str,
    pods: &[Pod],
) -> HashMap<String, PodStorageStats> {
    let node_names: BTreeSet<String> = pods
        .iter()
        .filter_map(|p| p.spec.as_ref().and_then(|s| s.node_name.clone()))
        .filter(|name| !name.is_empty())
        .collect();

    let partials = stream::iter(node_names)
        .map(|node| async move {
            match api.get_node_summary(&node).await {
                Ok(summary) => Some(collect_pod_storage(&summary, namespace)),
                Err(err) => {
                    debug!("kubelet summary for {} unavailable: {:#}", node, err);
                    None
                }
            }
        })
        .buffer_unordered(KUBELET_CONCURRENCY)
        .collect::<Vec<_>>()
        .await;

    let mut merged = HashMap::new();
    for partial in partials.into_iter().flatten() {
        merged.extend(partial);
    }
    merged
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use k8s_openapi::api::apps::v1::{
        DeploymentSpec, DeploymentStatus, StatefulSetSpec, StatefulSetStatus,
    };
    use k8s_openapi::api::batch::v1::CronJobStatus;
    use k8s_openapi::api::core::v1::{
        Container, ObjectReference, PodSpec, PodStatus, ResourceRequirements,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};

    use crate::core::client::cluster::mock::MockCluster;
    use crate::core::client::kube_resources::{
        CronJob, Deployment, Job, Quantity, ReplicaSet, StatefulSet,
    };
    use crate::core::client::metrics::{ContainerUsage, PodMetrics};
    use crate::core::client::summary_dto::{
        ContainerStats, FsStats, PodReference, PodStats, Summary,
    };

    use super::*;

    fn owner_ref(kind: &str, name: &str) -> OwnerReference {
        OwnerReference {
            api_version: "apps/v1".to_string(),
            kind: kind.to_string(),
            name: name.to_string(),
            uid: format!("uid-{}", name),
            ..Default::default()
        }
    }

    fn quantities(pairs: &[(&str, &str)]) -> BTreeMap<String, Quantity> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Quantity(v.to_string())))
            .collect()
    }

    fn pod(name: &str, owner: OwnerReference, node: &str) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("demo".to_string()),
                owner_references: Some(vec![owner]),
                ..Default::default()
            },
            spec: Some(PodSpec {
                node_name: Some(node.to_string()),
                containers: vec![Container {
                    name: "app".to_string(),
                    resources: Some(ResourceRequirements {
                        requests: Some(quantities(&[("cpu", "250m"), ("memory", "256Mi")])),
                        limits: Some(quantities(&[("cpu", "500m"), ("memory", "512Mi")])),
                        ..Default::default()
                    }),
                    ..Default::default()
                }],
                ..Default::default()
            }),
            status: Some(PodStatus {
                phase: Some("Running".to_string()),
                ..Default::default()
            }),
        }
    }

    fn deployment(name: &str, replicas: i32) -> Deployment {
        Deployment {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("demo".to_string()),
                ..Default::default()
            },
            spec: Some(DeploymentSpec {
                replicas: Some(replicas),
                ..Default::default()
            }),
            status: Some(DeploymentStatus {
                ready_replicas: Some(replicas),
                available_replicas: Some(replicas),
                ..Default::default()
            }),
        }
    }

    fn replica_set(name: &str, deployment: &str) -> ReplicaSet {
        ReplicaSet {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                owner_references: Some(vec![owner_ref("Deployment", deployment)]),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn web_namespace() -> MockCluster {
        MockCluster {
            pods: Some(vec![
                pod("web-7d9f-aaa", owner_ref("ReplicaSet", "web-7d9f"), "node-1"),
                pod("web-7d9f-bbb", owner_ref("ReplicaSet", "web-7d9f"), "node-1"),
            ]),
            deployments: Some(vec![deployment("web", 2)]),
            replica_sets: Some(vec![replica_set("web-7d9f", "web")]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn deployment_without_metrics_source() {
        let mut cluster = web_namespace();
        cluster.pod_metrics = None; // metrics-server unreachable

        let response = build_workload_response(&cluster, "demo", false)
            .await
            .unwrap();

        assert!(!response.metrics_available);
        assert!(!response.prometheus_available);
        assert_eq!(response.workloads.len(), 1);

        let web = &response.workloads[0];
        assert_eq!(web.kind, WorkloadKind::Deployment);
        assert_eq!(web.replicas, 2);
        assert_eq!(web.pods.len(), 2);
        for pod in &web.pods {
            let app = &pod.containers[0];
            assert!(app.usage.is_none());
            assert_eq!(app.requests.cpu.millicores, 250);
            assert_eq!(app.requests.memory.bytes, 268_435_456);
            assert_eq!(app.limits.cpu.millicores, 500);
        }
    }

    #[tokio::test]
    async fn metrics_attach_when_source_is_reachable() {
        let mut cluster = web_namespace();
        cluster.pod_metrics = Some(PodMetricsList {
            items: vec![PodMetrics {
                metadata: ObjectMeta {
                    name: Some("web-7d9f-aaa".to_string()),
                    ..Default::default()
                },
                containers: vec![ContainerUsage {
                    name: "app".to_string(),
                    usage: quantities(&[("cpu", "120000000n"), ("memory", "100Mi")]),
                }],
            }],
        });

        let response = build_workload_response(&cluster, "demo", true)
            .await
            .unwrap();
        assert!(response.metrics_available);
        assert!(response.prometheus_available);

        let web = &response.workloads[0];
        let measured = web.pods.iter().find(|p| p.name == "web-7d9f-aaa").unwrap();
        let usage = measured.containers[0].usage.as_ref().unwrap();
        assert_eq!(usage.cpu.millicores, 120);
        assert_eq!(usage.memory.bytes, 104_857_600);

        // the sibling pod had no metrics entry: usage stays absent even
        // though the source as a whole was reachable
        let unmeasured = web.pods.iter().find(|p| p.name == "web-7d9f-bbb").unwrap();
        assert!(unmeasured.containers[0].usage.is_none());
    }

    #[tokio::test]
    async fn replica_set_failure_degrades_deployment_grouping_only() {
        let mut cluster = web_namespace();
        cluster.replica_sets = None; // best-effort source down
        cluster.stateful_sets = Some(vec![StatefulSet {
            metadata: ObjectMeta {
                name: Some("db".to_string()),
                ..Default::default()
            },
            spec: Some(StatefulSetSpec {
                replicas: Some(1),
                ..Default::default()
            }),
            status: Some(StatefulSetStatus {
                ready_replicas: Some(1),
                available_replicas: Some(1),
                ..Default::default()
            }),
        }]);
        let mut pods = cluster.pods.take().unwrap();
        pods.push(pod("db-0", owner_ref("StatefulSet", "db"), "node-1"));
        cluster.pods = Some(pods);

        let response = build_workload_response(&cluster, "demo", false)
            .await
            .unwrap();

        // request still succeeds; deployment-owned pods are just ungrouped
        let web = response
            .workloads
            .iter()
            .find(|w| w.name == "web")
            .unwrap();
        assert!(web.pods.is_empty());

        let db = response.workloads.iter().find(|w| w.name == "db").unwrap();
        assert_eq!(db.kind, WorkloadKind::StatefulSet);
        assert_eq!(db.pods.len(), 1);
    }

    #[tokio::test]
    async fn required_deployment_fetch_failure_aborts() {
        let mut cluster = web_namespace();
        cluster.deployments = None;
        assert!(build_workload_response(&cluster, "demo", false)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn required_pod_fetch_failure_aborts() {
        let mut cluster = web_namespace();
        cluster.pods = None;
        assert!(build_workload_response(&cluster, "demo", false)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn kubelet_failure_leaves_storage_fields_absent() {
        // no summaries registered → every get_node_summary call fails
        let cluster = web_namespace();

        let response = build_workload_response(&cluster, "demo", false)
            .await
            .unwrap();
        let web = &response.workloads[0];
        for pod in &web.pods {
            let eph = &pod.containers[0].ephemeral_storage;
            assert!(eph.usage.is_none());
            // spec-derived fields are unaffected
            assert_eq!(pod.containers[0].requests.cpu.millicores, 250);
        }
    }

    #[tokio::test]
    async fn kubelet_stats_flow_into_ephemeral_usage() {
        let mut cluster = web_namespace();
        cluster.summaries.insert(
            "node-1".to_string(),
            Summary {
                pods: vec![PodStats {
                    pod_ref: PodReference {
                        name: "web-7d9f-aaa".to_string(),
                        namespace: "demo".to_string(),
                    },
                    containers: vec![ContainerStats {
                        name: "app".to_string(),
                        rootfs: Some(FsStats { used_bytes: 2_000 }),
                        logs: Some(FsStats { used_bytes: 48 }),
                    }],
                    volumes: vec![],
                }],
            },
        );

        let response = build_workload_response(&cluster, "demo", false)
            .await
            .unwrap();
        let web = &response.workloads[0];
        let measured = web.pods.iter().find(|p| p.name == "web-7d9f-aaa").unwrap();
        assert_eq!(
            measured.containers[0]
                .ephemeral_storage
                .usage
                .as_ref()
                .unwrap()
                .bytes,
            2_048
        );
    }

    #[tokio::test]
    async fn stateful_set_available_falls_back_to_current() {
        let mut cluster = MockCluster::default();
        cluster.stateful_sets = Some(vec![StatefulSet {
            metadata: ObjectMeta {
                name: Some("db".to_string()),
                ..Default::default()
            },
            spec: Some(StatefulSetSpec {
                replicas: Some(3),
                ..Default::default()
            }),
            status: Some(StatefulSetStatus {
                ready_replicas: Some(3),
                available_replicas: Some(0),
                current_replicas: Some(3),
                ..Default::default()
            }),
        }]);

        let response = build_workload_response(&cluster, "demo", false)
            .await
            .unwrap();
        let db = &response.workloads[0];
        assert_eq!(db.available_replicas, 3);
    }

    #[tokio::test]
    async fn cron_job_replicas_mirror_active_job_count() {
        let mut cluster = MockCluster::default();
        cluster.cron_jobs = Some(vec![CronJob {
            metadata: ObjectMeta {
                name: Some("backup".to_string()),
                ..Default::default()
            },
            status: Some(CronJobStatus {
                active: Some(vec![
                    ObjectReference {
                        name: Some("backup-29".to_string()),
                        ..Default::default()
                    },
                    ObjectReference {
                        name: Some("backup-30".to_string()),
                        ..Default::default()
                    },
                ]),
                ..Default::default()
            }),
            ..Default::default()
        }]);
        // the job list resolves active job pods to the cronjob
        cluster.jobs = Some(vec![Job {
            metadata: ObjectMeta {
                name: Some("backup-29".to_string()),
                owner_references: Some(vec![owner_ref("CronJob", "backup")]),
                ..Default::default()
            },
            ..Default::default()
        }]);
        cluster.pods = Some(vec![pod(
            "backup-29-xyz",
            owner_ref("Job", "backup-29"),
            "node-1",
        )]);

        let response = build_workload_response(&cluster, "demo", false)
            .await
            .unwrap();
        let backup = &response.workloads[0];
        assert_eq!(backup.kind, WorkloadKind::CronJob);
        assert_eq!(backup.replicas, 2);
        assert_eq!(backup.ready_replicas, 2);
        assert_eq!(backup.available_replicas, 2);
        assert_eq!(backup.pods.len(), 1);
    }

    #[tokio::test]
    async fn workload_objects_without_pods_still_appear() {
        let mut cluster = MockCluster::default();
        cluster.deployments = Some(vec![deployment("idle", 0)]);

        let response = build_workload_response(&cluster, "demo", false)
            .await
            .unwrap();
        assert_eq!(response.workloads.len(), 1);
        assert!(response.workloads[0].pods.is_empty());
    }
}
