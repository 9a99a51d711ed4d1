use serde::Serialize;

use crate::domain::workload::model::ResourcePair;

/// Node readiness derived from the `Ready` condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeReadiness {
    Ready,
    NotReady,
    Unknown,
}

/// Cluster-wide node view: capacity/allocatable straight from the node
/// object, requested/limited derived by summing container requests/limits
/// over all live pods scheduled to the node, usage from metrics-server when
/// reachable.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeOverview {
    pub name: String,
    pub status: NodeReadiness,
    pub roles: Vec<String>,
    pub capacity: ResourcePair,
    pub allocatable: ResourcePair,
    pub requested: ResourcePair,
    pub limited: ResourcePair,
    pub usage: Option<ResourcePair>,
    pub pod_count: usize,
    pub max_pods: i64,
}
