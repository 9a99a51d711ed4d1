use axum::extract::{Path, State};
use axum::Json;
use tracing::{error, warn};

use crate::api::extract::BearerToken;
use crate::app_state::AppState;
use crate::core::client::cluster::ClusterApi;
use crate::core::client::metrics::PodMetricsList;
use crate::domain::workload::model::WorkloadResponse;
use crate::domain::workload::service::build_workload_response;
use crate::errors::{internal_error, AppError};

pub struct WorkloadController;

impl WorkloadController {
    /// All workloads (Deployments, StatefulSets, CronJobs) in a namespace
    /// with per-container metrics, ephemeral storage and volume details.
    pub async fn list_workloads(
        State(state): State<AppState>,
        BearerToken(token): BearerToken,
        Path(namespace): Path<String>,
    ) -> Result<Json<WorkloadResponse>, AppError> {
        let cluster = state.cluster(&token);
        match build_workload_response(&cluster, &namespace, state.prometheus_available()).await {
            Ok(response) => Ok(Json(response)),
            Err(err) => {
                error!("failed to build workload view for {}: {:#}", namespace, err);
                Err(internal_error(err))
            }
        }
    }

    /// Raw pod metrics passthrough from metrics-server, useful for debugging.
    pub async fn get_pod_metrics(
        State(state): State<AppState>,
        BearerToken(token): BearerToken,
        Path(namespace): Path<String>,
    ) -> Result<Json<PodMetricsList>, AppError> {
        let cluster = state.cluster(&token);
        match cluster.list_pod_metrics(&namespace).await {
            Ok(metrics) => Ok(Json(metrics)),
            Err(err) => {
                warn!("metrics-server error for {}: {:#}", namespace, err);
                Err(AppError::ServiceUnavailable(
                    "metrics-server unavailable".to_string(),
                ))
            }
        }
    }
}
