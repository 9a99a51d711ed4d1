use axum::extract::State;
use axum::Json;
use tracing::error;

use crate::api::extract::BearerToken;
use crate::app_state::AppState;
use crate::domain::namespace::service::{list_active_namespaces, NamespaceItem};
use crate::errors::{internal_error, AppError};

pub struct NamespaceController;

impl NamespaceController {
    /// Namespaces that contain at least one pod.
    pub async fn list_namespaces(
        State(state): State<AppState>,
        BearerToken(token): BearerToken,
    ) -> Result<Json<Vec<NamespaceItem>>, AppError> {
        let cluster = state.cluster(&token);
        match list_active_namespaces(&cluster).await {
            Ok(items) => Ok(Json(items)),
            Err(err) => {
                error!("failed to list namespaces: {:#}", err);
                Err(internal_error(err))
            }
        }
    }
}
