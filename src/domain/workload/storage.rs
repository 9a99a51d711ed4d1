//! Joins kubelet `/stats/summary` data into per-pod lookup tables.
//!
//! A node summary covers every pod scheduled to the node, across all
//! namespaces; only pods in the requested namespace are kept. The caller
//! fetches one summary per distinct node and merges the per-node maps
//! sequentially, so nothing here needs locking.

use std::collections::HashMap;

use crate::core::client::summary_dto::{Summary, VolumeStats};

/// Kubelet-derived storage stats for one pod.
#[derive(Debug, Clone, Default)]
pub struct PodStorageStats {
    /// container name → ephemeral bytes (rootfs + logs)
    pub container_ephemeral: HashMap<String, i64>,
    /// volume name → stats
    pub volumes: HashMap<String, VolumeStats>,
}

/// Extracts per-pod storage stats for one namespace from one node summary.
pub fn collect_pod_storage(summary: &Summary, namespace: &str) -> HashMap<String, PodStorageStats> {
    let mut by_pod = HashMap::new();

    for pod_stats in &summary.pods {
        if pod_stats.pod_ref.namespace != namespace {
            continue;
        }

        let mut stats = PodStorageStats::default();
        for container in &pod_stats.containers {
            let used = container.rootfs.as_ref().map(|fs| fs.used_bytes).unwrap_or(0)
                + container.logs.as_ref().map(|fs| fs.used_bytes).unwrap_or(0);
            stats
                .container_ephemeral
                .insert(container.name.clone(), used);
        }
        for volume in &pod_stats.volumes {
            stats.volumes.insert(volume.name.clone(), volume.clone());
        }
        by_pod.insert(pod_stats.pod_ref.name.clone(), stats);
    }

    by_pod
}
