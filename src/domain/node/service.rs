//! Cluster-wide node aggregation: per-node request/limit sums over all live
//! pods, merged with node capacity/allocatable, readiness and live usage.

use std::collections::HashMap;

use anyhow::{Context, Result};

use crate::core::client::cluster::ClusterApi;
use crate::core::client::kube_resources::{Node, NodeCondition, Pod, Quantity};
use crate::core::quantity::{parse_cpu, parse_memory, parse_pod_count};
use crate::domain::best_effort;
use crate::domain::node::model::{NodeOverview, NodeReadiness};
use crate::domain::workload::model::{ResourceKind, ResourcePair, ResourceValue};

#[derive(Debug, Default)]
struct NodeAccumulator {
    cpu_requested: i64,
    memory_requested: i64,
    cpu_limited: i64,
    memory_limited: i64,
    pod_count: usize,
}

pub async fn build_node_overview(api: &dyn ClusterApi) -> Result<Vec<NodeOverview>> {
    // Nodes and the cluster-wide pod list are both required; node metrics
    // are best-effort and their absence leaves `usage` empty everywhere.
    let (nodes, all_pods, node_metrics) = tokio::try_join!(
        api.list_nodes(),
        api.list_all_pods(),
        best_effort("node metrics", api.list_node_metrics()),
    )
    .context("listing nodes and pods")?;

    let usage_index: HashMap<String, ResourcePair> = node_metrics
        .map(|list| {
            list.items
                .into_iter()
                .filter_map(|m| {
                    let name = m.metadata.name.clone()?;
                    let raw = |kind: ResourceKind| {
                        m.usage
                            .get(kind.as_str())
                            .map(|q| q.0.as_str())
                            .unwrap_or("")
                            .to_string()
                    };
                    Some((
                        name,
                        ResourcePair {
                            cpu: ResourceValue::cpu(&raw(ResourceKind::Cpu)),
                            memory: ResourceValue::memory(&raw(ResourceKind::Memory)),
                        },
                    ))
                })
                .collect()
        })
        .unwrap_or_default();

    let accumulators = accumulate_pods(&all_pods);

    let mut overview = Vec::with_capacity(nodes.len());
    for node in &nodes {
        let name = node.metadata.name.clone().unwrap_or_default();
        let status = node.status.as_ref();
        let capacity = status.and_then(|s| s.capacity.as_ref());
        let allocatable = status.and_then(|s| s.allocatable.as_ref());

        let accumulated = accumulators.get(&name);
        let (requested, limited) = accumulated
            .map(|a| {
                (
                    ResourcePair {
                        cpu: ResourceValue::from_millicores(a.cpu_requested),
                        memory: ResourceValue::from_bytes(a.memory_requested),
                    },
                    ResourcePair {
                        cpu: ResourceValue::from_millicores(a.cpu_limited),
                        memory: ResourceValue::from_bytes(a.memory_limited),
                    },
                )
            })
            .unwrap_or_default();

        overview.push(NodeOverview {
            status: readiness(status.and_then(|s| s.conditions.as_deref())),
            roles: roles_from_labels(node),
            capacity: resource_pair(capacity),
            allocatable: resource_pair(allocatable),
            requested,
            limited,
            usage: usage_index.get(&name).cloned(),
            pod_count: accumulated.map(|a| a.pod_count).unwrap_or(0),
            max_pods: capacity
                .and_then(|c| c.get("pods"))
                .map(|q| parse_pod_count(&q.0))
                .unwrap_or(0),
            name,
        });
    }
    Ok(overview)
}

/// Sums container requests/limits per node over all live pods. Pods in a
/// terminal phase (Succeeded/Failed) hold no resources and are skipped, as
/// are pods not yet scheduled to a node.
fn accumulate_pods(pods: &[Pod]) -> HashMap<String, NodeAccumulator> {
    let mut accumulators: HashMap<String, NodeAccumulator> = HashMap::new();
    for pod in pods {
        let Some(node) = pod
            .spec
            .as_ref()
            .and_then(|s| s.node_name.as_deref())
            .filter(|n| !n.is_empty())
        else {
            continue;
        };
        let phase = pod
            .status
            .as_ref()
            .and_then(|s| s.phase.as_deref())
            .unwrap_or("");
        if phase == "Succeeded" || phase == "Failed" {
            continue;
        }

        let accumulator = accumulators.entry(node.to_string()).or_default();
        accumulator.pod_count += 1;
        for container in pod.spec.iter().flat_map(|s| &s.containers) {
            let requests = container
                .resources
                .as_ref()
                .and_then(|r| r.requests.as_ref());
            let limits = container.resources.as_ref().and_then(|r| r.limits.as_ref());
            accumulator.cpu_requested += parse_cpu(raw(requests, ResourceKind::Cpu));
            accumulator.memory_requested += parse_memory(raw(requests, ResourceKind::Memory));
            accumulator.cpu_limited += parse_cpu(raw(limits, ResourceKind::Cpu));
            accumulator.memory_limited += parse_memory(raw(limits, ResourceKind::Memory));
        }
    }
    accumulators
}

fn raw<'a>(
    map: Option<&'a std::collections::BTreeMap<String, Quantity>>,
    kind: ResourceKind,
) -> &'a str {
    map.and_then(|m| m.get(kind.as_str()))
        .map(|q| q.0.as_str())
        .unwrap_or("")
}

fn resource_pair(map: Option<&std::collections::BTreeMap<String, Quantity>>) -> ResourcePair {
    ResourcePair {
        cpu: ResourceValue::cpu(raw(map, ResourceKind::Cpu)),
        memory: ResourceValue::memory(raw(map, ResourceKind::Memory)),
    }
}

fn readiness(conditions: Option<&[NodeCondition]>) -> NodeReadiness {
    for condition in conditions.unwrap_or_default() {
        if condition.type_ == "Ready" {
            return match condition.status.as_str() {
                "True" => NodeReadiness::Ready,
                "False" => NodeReadiness::NotReady,
                _ => NodeReadiness::Unknown,
            };
        }
    }
    NodeReadiness::Unknown
}

/// Role names from `node-role.kubernetes.io/<role>` labels; nodes without
/// any role label default to "worker".
fn roles_from_labels(node: &Node) -> Vec<String> {
    let mut roles: Vec<String> = node
        .metadata
        .labels
        .iter()
        .flatten()
        .filter_map(|(key, _)| key.strip_prefix("node-role.kubernetes.io/"))
        .filter(|role| !role.is_empty())
        .map(str::to_string)
        .collect();
    if roles.is_empty() {
        roles.push("worker".to_string());
    }
    roles
}
