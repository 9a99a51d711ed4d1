use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use tracing::warn;

use crate::api::extract::BearerToken;
use crate::app_state::AppState;
use crate::core::client::cluster::ClusterApi;
use crate::errors::AppError;

pub struct AuthController;

impl AuthController {
    /// Checks whether the provided token can reach the Kubernetes API.
    pub async fn verify_token(
        State(state): State<AppState>,
        BearerToken(token): BearerToken,
    ) -> Result<Json<Value>, AppError> {
        if let Err(err) = state.cluster(&token).verify_token().await {
            warn!("token verification failed: {:#}", err);
            return Err(AppError::Unauthorized("authentication failed".to_string()));
        }
        Ok(Json(json!({ "status": "ok" })))
    }
}
