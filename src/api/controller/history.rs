use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::error;

use crate::app_state::AppState;
use crate::core::client::prometheus::{HistoryResult, NamespaceHistoryResult, PrometheusClient};
use crate::domain::history::service;
use crate::errors::AppError;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub range: Option<String>,
}

pub struct HistoryController;

impl HistoryController {
    /// CPU/memory history for every container in a namespace.
    pub async fn namespace_history(
        State(state): State<AppState>,
        Path(namespace): Path<String>,
        Query(query): Query<HistoryQuery>,
    ) -> Result<Json<NamespaceHistoryResult>, AppError> {
        let prometheus = require_prometheus(&state)?;
        validate(&[&namespace])?;

        let range = query.range.as_deref().unwrap_or("1h");
        match service::namespace_history(prometheus, &namespace, range).await {
            Ok(result) => Ok(Json(result)),
            Err(err) => {
                error!("prometheus namespace query failed for {}: {:#}", namespace, err);
                Err(AppError::UpstreamError(
                    "failed to query prometheus".to_string(),
                ))
            }
        }
    }

    /// CPU/memory history for a single container.
    pub async fn container_history(
        State(state): State<AppState>,
        Path((namespace, pod, container)): Path<(String, String, String)>,
        Query(query): Query<HistoryQuery>,
    ) -> Result<Json<HistoryResult>, AppError> {
        let prometheus = require_prometheus(&state)?;
        validate(&[&namespace, &pod, &container])?;

        let range = query.range.as_deref().unwrap_or("1h");
        match service::container_history(prometheus, &namespace, &pod, &container, range).await {
            Ok(result) => Ok(Json(result)),
            Err(err) => {
                error!(
                    "prometheus query failed for {}/{}/{}: {:#}",
                    namespace, pod, container, err
                );
                Err(AppError::UpstreamError(
                    "failed to query prometheus".to_string(),
                ))
            }
        }
    }
}

fn require_prometheus(state: &AppState) -> Result<&PrometheusClient, AppError> {
    state
        .prometheus
        .as_deref()
        .ok_or_else(|| AppError::ServiceUnavailable("prometheus not configured".to_string()))
}

fn validate(values: &[&str]) -> Result<(), AppError> {
    if values.iter().all(|v| service::valid_label_value(v)) {
        Ok(())
    } else {
        Err(AppError::BadRequest("invalid parameter".to_string()))
    }
}
