//! API routes under /api/v1. Every handler here takes a bearer token.

use axum::{routing::get, Router};

use crate::api::controller::auth::AuthController;
use crate::api::controller::history::HistoryController;
use crate::api::controller::namespace::NamespaceController;
use crate::api::controller::node::NodeController;
use crate::api::controller::workload::WorkloadController;
use crate::app_state::AppState;

/// Build the router for the authenticated API under /api/v1
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Auth
        .route("/auth/verify", get(AuthController::verify_token))
        // Cluster-wide node overview
        .route("/nodes", get(NodeController::list_nodes))
        // Namespaces
        .route("/namespaces", get(NamespaceController::list_namespaces))
        // Workloads + pod resource details
        .route(
            "/namespaces/{namespace}/workloads",
            get(WorkloadController::list_workloads),
        )
        // Raw pod metrics (debugging aid)
        .route(
            "/namespaces/{namespace}/metrics",
            get(WorkloadController::get_pod_metrics),
        )
        // Prometheus history (requires PROMETHEUS_URL)
        .route(
            "/namespaces/{namespace}/history",
            get(HistoryController::namespace_history),
        )
        .route(
            "/namespaces/{namespace}/history/{pod}/{container}",
            get(HistoryController::container_history),
        )
}
