//! Builds the denormalized per-pod records for one workload group, merging
//! spec (requests/limits), live metrics usage, and kubelet storage stats.
//!
//! The builder never fails: every auxiliary source is optional, and its
//! absence degrades the corresponding field to None instead of erroring.

use std::collections::{BTreeMap, HashMap};

use crate::core::client::kube_resources::{PersistentVolumeClaim, Pod, Quantity};
use crate::domain::workload::model::{
    ContainerResources, EphemeralStorageInfo, PodDetail, ResourceKind, ResourcePair,
    ResourceValue, VolumeDetail,
};
use crate::domain::workload::storage::PodStorageStats;

/// podName → containerName → live usage, parsed once up front.
pub type MetricsIndex = HashMap<String, HashMap<String, ResourcePair>>;

fn quantity_raw<'a>(map: Option<&'a BTreeMap<String, Quantity>>, kind: ResourceKind) -> &'a str {
    map.and_then(|m| m.get(kind.as_str()))
        .map(|q| q.0.as_str())
        .unwrap_or("")
}

pub fn build_pod_details(
    pods: &[&Pod],
    metrics: &MetricsIndex,
    storage: &HashMap<String, PodStorageStats>,
    pvcs: &HashMap<String, PersistentVolumeClaim>,
) -> Vec<PodDetail> {
    let mut details = Vec::with_capacity(pods.len());

    for pod in pods {
        let pod_name = pod.metadata.name.clone().unwrap_or_default();
        let pod_storage = storage.get(&pod_name);
        let pod_metrics = metrics.get(&pod_name);

        let mut containers = Vec::new();
        for container in pod.spec.iter().flat_map(|s| &s.containers) {
            let requests = container
                .resources
                .as_ref()
                .and_then(|r| r.requests.as_ref());
            let limits = container.resources.as_ref().and_then(|r| r.limits.as_ref());

            let mut ephemeral = EphemeralStorageInfo::default();
            let request_raw = quantity_raw(requests, ResourceKind::EphemeralStorage);
            if !request_raw.is_empty() {
                ephemeral.request = Some(ResourceValue::memory(request_raw));
            }
            let limit_raw = quantity_raw(limits, ResourceKind::EphemeralStorage);
            if !limit_raw.is_empty() {
                ephemeral.limit = Some(ResourceValue::memory(limit_raw));
            }
            if let Some(used) =
                pod_storage.and_then(|s| s.container_ephemeral.get(&container.name))
            {
                ephemeral.usage = Some(ResourceValue::from_bytes(*used));
            }

            containers.push(ContainerResources {
                name: container.name.clone(),
                requests: ResourcePair {
                    cpu: ResourceValue::cpu(quantity_raw(requests, ResourceKind::Cpu)),
                    memory: ResourceValue::memory(quantity_raw(requests, ResourceKind::Memory)),
                },
                limits: ResourcePair {
                    cpu: ResourceValue::cpu(quantity_raw(limits, ResourceKind::Cpu)),
                    memory: ResourceValue::memory(quantity_raw(limits, ResourceKind::Memory)),
                },
                usage: pod_metrics.and_then(|m| m.get(&container.name)).cloned(),
                ephemeral_storage: ephemeral,
            });
        }

        let mut volumes = Vec::new();
        for volume in pod.spec.iter().flat_map(|s| s.volumes.iter().flatten()) {
            let volume_stats = pod_storage.and_then(|s| s.volumes.get(&volume.name));

            if let Some(pvc_source) = &volume.persistent_volume_claim {
                let claim = pvcs.get(&pvc_source.claim_name);
                let spec = claim.and_then(|c| c.spec.as_ref());
                let capacity = claim
                    .and_then(|c| c.status.as_ref())
                    .and_then(|s| s.capacity.as_ref())
                    .and_then(|c| c.get(ResourceKind::Storage.as_str()))
                    .map(|q| ResourceValue::memory(&q.0));

                volumes.push(VolumeDetail::Pvc {
                    name: volume.name.clone(),
                    pvc_name: pvc_source.claim_name.clone(),
                    storage_class: spec.and_then(|s| s.storage_class_name.clone()),
                    access_modes: spec.and_then(|s| s.access_modes.clone()).unwrap_or_default(),
                    capacity,
                    usage: volume_stats.map(|vs| ResourceValue::from_bytes(vs.used_bytes)),
                    available: volume_stats
                        .map(|vs| ResourceValue::from_bytes(vs.available_bytes)),
                });
            } else if let Some(empty_dir) = &volume.empty_dir {
                volumes.push(VolumeDetail::EmptyDir {
                    name: volume.name.clone(),
                    medium: empty_dir.medium.clone().unwrap_or_default(),
                    size_limit: empty_dir
                        .size_limit
                        .as_ref()
                        .filter(|q| !q.0.is_empty())
                        .map(|q| ResourceValue::memory(&q.0)),
                    usage: volume_stats.map(|vs| ResourceValue::from_bytes(vs.used_bytes)),
                    capacity: volume_stats
                        .filter(|vs| vs.capacity_bytes > 0)
                        .map(|vs| ResourceValue::from_bytes(vs.capacity_bytes)),
                });
            }
            // volumes of any other kind (configMap, secret, projected, ...)
            // are not storage the dashboard reports on
        }

        details.push(PodDetail {
            name: pod_name,
            phase: pod
                .status
                .as_ref()
                .and_then(|s| s.phase.clone())
                .unwrap_or_default(),
            containers,
            volumes,
        });
    }

    details
}
