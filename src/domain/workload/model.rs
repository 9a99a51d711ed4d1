//! Denormalized workload view rendered by the dashboard. Every type here is
//! a per-request value object rebuilt from live cluster data; nothing is
//! shared or cached across requests.

use serde::Serialize;

use crate::core::quantity::{format_bytes, format_millicores, parse_cpu, parse_memory};

/// Resource map keys this system understands. Everything else in a spec's
/// requests/limits map is ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Cpu,
    Memory,
    EphemeralStorage,
    /// PVC capacity key in `status.capacity`.
    Storage,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Cpu => "cpu",
            ResourceKind::Memory => "memory",
            ResourceKind::EphemeralStorage => "ephemeral-storage",
            ResourceKind::Storage => "storage",
        }
    }
}

/// A parsed quantity that keeps its original textual form. Exactly one of
/// the numeric fields is populated: CPU readings fill `millicores`,
/// memory/storage readings fill `bytes`. An empty `raw` means the quantity
/// was never set; the zero in the numeric field is then *not* an explicit
/// zero, and callers must check `raw` to tell the two apart.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourceValue {
    pub raw: String,
    #[serde(skip_serializing_if = "int_is_zero")]
    pub bytes: i64,
    #[serde(skip_serializing_if = "int_is_zero")]
    pub millicores: i64,
}

fn int_is_zero(v: &i64) -> bool {
    *v == 0
}

impl ResourceValue {
    /// Parses a CPU quantity; empty input stays fully unset.
    pub fn cpu(raw: &str) -> ResourceValue {
        if raw.is_empty() {
            return ResourceValue::default();
        }
        ResourceValue {
            raw: raw.to_string(),
            bytes: 0,
            millicores: parse_cpu(raw),
        }
    }

    /// Parses a memory/storage quantity; empty input stays fully unset.
    pub fn memory(raw: &str) -> ResourceValue {
        if raw.is_empty() {
            return ResourceValue::default();
        }
        ResourceValue {
            raw: raw.to_string(),
            bytes: parse_memory(raw),
            millicores: 0,
        }
    }

    /// Wraps an already-summed millicore count, rendering the raw form.
    pub fn from_millicores(millicores: i64) -> ResourceValue {
        ResourceValue {
            raw: format_millicores(millicores),
            bytes: 0,
            millicores,
        }
    }

    /// Wraps an already-summed byte count, rendering the raw form.
    pub fn from_bytes(bytes: i64) -> ResourceValue {
        ResourceValue {
            raw: format_bytes(bytes),
            bytes,
            millicores: 0,
        }
    }
}

/// CPU + memory pair, used for requests, limits and live usage alike.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResourcePair {
    pub cpu: ResourceValue,
    pub memory: ResourceValue,
}

/// Three independently-optional views of a container's ephemeral storage:
/// request/limit come from the pod spec, usage from the kubelet. Absent
/// means "not set" / "kubelet data unavailable", never zero.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EphemeralStorageInfo {
    pub request: Option<ResourceValue>,
    pub limit: Option<ResourceValue>,
    pub usage: Option<ResourceValue>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum VolumeDetail {
    #[serde(rename = "pvc", rename_all = "camelCase")]
    Pvc {
        name: String,
        pvc_name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        storage_class: Option<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        access_modes: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        capacity: Option<ResourceValue>,
        #[serde(skip_serializing_if = "Option::is_none")]
        usage: Option<ResourceValue>,
        #[serde(skip_serializing_if = "Option::is_none")]
        available: Option<ResourceValue>,
    },
    #[serde(rename = "emptyDir", rename_all = "camelCase")]
    EmptyDir {
        name: String,
        /// "" = node disk, "Memory" = tmpfs
        medium: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        size_limit: Option<ResourceValue>,
        #[serde(skip_serializing_if = "Option::is_none")]
        usage: Option<ResourceValue>,
        #[serde(skip_serializing_if = "Option::is_none")]
        capacity: Option<ResourceValue>,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerResources {
    pub name: String,
    pub requests: ResourcePair,
    pub limits: ResourcePair,
    /// None when no live metrics exist for this container.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<ResourcePair>,
    pub ephemeral_storage: EphemeralStorageInfo,
}

#[derive(Debug, Clone, Serialize)]
pub struct PodDetail {
    pub name: String,
    pub phase: String,
    pub containers: Vec<ContainerResources>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<VolumeDetail>,
}

/// The workload kinds pods are grouped under. Bare pods and unrecognized
/// owners never appear in the workload view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WorkloadKind {
    Deployment,
    StatefulSet,
    CronJob,
}

/// Identity a pod's ownership chain resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkloadKey {
    pub kind: WorkloadKind,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentDetail {
    pub kind: WorkloadKind,
    pub name: String,
    pub namespace: String,
    pub replicas: i32,
    pub ready_replicas: i32,
    pub available_replicas: i32,
    pub pods: Vec<PodDetail>,
}

/// Full per-namespace response for the workloads endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadResponse {
    pub workloads: Vec<DeploymentDetail>,
    pub metrics_available: bool,
    pub prometheus_available: bool,
}
