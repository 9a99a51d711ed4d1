//! Kubelet `/stats/summary` payload, reached through the API server proxy.
//! Only the pod-scoped filesystem and volume stats are modeled; node-level
//! CPU/memory in the same payload comes from metrics-server instead.

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Summary {
    #[serde(default)]
    pub pods: Vec<PodStats>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodStats {
    #[serde(default)]
    pub pod_ref: PodReference,
    #[serde(default)]
    pub containers: Vec<ContainerStats>,
    // kubelet names this field "volume", singular
    #[serde(default, rename = "volume")]
    pub volumes: Vec<VolumeStats>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PodReference {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContainerStats {
    #[serde(default)]
    pub name: String,
    pub rootfs: Option<FsStats>,
    pub logs: Option<FsStats>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FsStats {
    #[serde(default)]
    pub used_bytes: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeStats {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub used_bytes: i64,
    #[serde(default)]
    pub capacity_bytes: i64,
    #[serde(default)]
    pub available_bytes: i64,
}
