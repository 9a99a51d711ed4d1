//! Pod → workload ownership resolution via owner references.
//!
//! Two levels of indirection are followed: Pod → ReplicaSet → Deployment and
//! Pod → Job → CronJob; StatefulSets own their pods directly. Pods whose
//! chain does not terminate at one of the three workload kinds are absent
//! from the output and never appear in any workload grouping.

use std::collections::HashMap;

use crate::core::client::kube_resources::{Job, Pod, ReplicaSet};
use crate::domain::workload::model::{WorkloadKey, WorkloadKind};

/// Owner kinds a pod can carry that are meaningful here.
#[derive(Debug, Clone, PartialEq, Eq)]
enum OwnerKind {
    ReplicaSet,
    StatefulSet,
    Job,
    Other(String),
}

impl From<&str> for OwnerKind {
    fn from(kind: &str) -> Self {
        match kind {
            "ReplicaSet" => OwnerKind::ReplicaSet,
            "StatefulSet" => OwnerKind::StatefulSet,
            "Job" => OwnerKind::Job,
            other => OwnerKind::Other(other.to_string()),
        }
    }
}

/// Resolves each pod to the workload that (transitively) owns it.
///
/// The replica-set and job lists are nullable because their fetches are
/// best-effort; when one is absent, only the owner kinds that depend on it
/// stop resolving.
pub fn resolve_ownership(
    pods: &[Pod],
    replica_sets: Option<&[ReplicaSet]>,
    jobs: Option<&[Job]>,
) -> HashMap<String, WorkloadKey> {
    let mut rs_to_deployment: HashMap<&str, &str> = HashMap::new();
    for rs in replica_sets.unwrap_or_default() {
        let Some(rs_name) = rs.metadata.name.as_deref() else {
            continue;
        };
        for owner in rs.metadata.owner_references.iter().flatten() {
            if owner.kind == "Deployment" {
                rs_to_deployment.insert(rs_name, owner.name.as_str());
            }
        }
    }

    let mut job_to_cronjob: HashMap<&str, &str> = HashMap::new();
    for job in jobs.unwrap_or_default() {
        let Some(job_name) = job.metadata.name.as_deref() else {
            continue;
        };
        for owner in job.metadata.owner_references.iter().flatten() {
            if owner.kind == "CronJob" {
                job_to_cronjob.insert(job_name, owner.name.as_str());
            }
        }
    }

    let mut pod_to_workload = HashMap::new();
    for pod in pods {
        let Some(pod_name) = pod.metadata.name.as_deref() else {
            continue;
        };
        for owner in pod.metadata.owner_references.iter().flatten() {
            match OwnerKind::from(owner.kind.as_str()) {
                OwnerKind::ReplicaSet => {
                    // an orphan replica-set (no Deployment above it) leaves
                    // the pod unresolved
                    if let Some(deployment) = rs_to_deployment.get(owner.name.as_str()) {
                        pod_to_workload.insert(
                            pod_name.to_string(),
                            WorkloadKey {
                                kind: WorkloadKind::Deployment,
                                name: deployment.to_string(),
                            },
                        );
                    }
                }
                OwnerKind::StatefulSet => {
                    pod_to_workload.insert(
                        pod_name.to_string(),
                        WorkloadKey {
                            kind: WorkloadKind::StatefulSet,
                            name: owner.name.clone(),
                        },
                    );
                }
                OwnerKind::Job => {
                    if let Some(cronjob) = job_to_cronjob.get(owner.name.as_str()) {
                        pod_to_workload.insert(
                            pod_name.to_string(),
                            WorkloadKey {
                                kind: WorkloadKind::CronJob,
                                name: cronjob.to_string(),
                            },
                        );
                    }
                }
                OwnerKind::Other(_) => {}
            }
        }
    }
    pod_to_workload
}
