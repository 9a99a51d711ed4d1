//! List types served by the metrics-server aggregated API
//! (`metrics.k8s.io/v1beta1`). These are not part of k8s-openapi, so they
//! get their own serde models.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::client::kube_resources::{ObjectMeta, Quantity};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PodMetricsList {
    #[serde(default)]
    pub items: Vec<PodMetrics>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PodMetrics {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub containers: Vec<ContainerUsage>,
}

/// Live usage for one container, keyed by resource name ("cpu", "memory").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContainerUsage {
    pub name: String,
    #[serde(default)]
    pub usage: BTreeMap<String, Quantity>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeMetricsList {
    #[serde(default)]
    pub items: Vec<NodeMetrics>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeMetrics {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub usage: BTreeMap<String, Quantity>,
}
