use axum::extract::State;
use axum::Json;
use tracing::error;

use crate::api::extract::BearerToken;
use crate::app_state::AppState;
use crate::domain::node::model::NodeOverview;
use crate::domain::node::service::build_node_overview;
use crate::errors::{internal_error, AppError};

pub struct NodeController;

impl NodeController {
    /// Cluster-wide node overview with per-node resource aggregation.
    pub async fn list_nodes(
        State(state): State<AppState>,
        BearerToken(token): BearerToken,
    ) -> Result<Json<Vec<NodeOverview>>, AppError> {
        let cluster = state.cluster(&token);
        match build_node_overview(&cluster).await {
            Ok(overview) => Ok(Json(overview)),
            Err(err) => {
                error!("failed to build node overview: {:#}", err);
                Err(internal_error(err))
            }
        }
    }
}
