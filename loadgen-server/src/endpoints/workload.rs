//! The workload endpoint.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::{Json, Router, routing};
use loadgen_service::{WorkloadRequest, WorkloadResult};

use crate::endpoints::common::{ApiError, ApiResult};
use crate::state::ServiceState;

pub fn router() -> Router<ServiceState> {
    Router::new()
        .route("/cpu-io-no-db/", routing::get(cpu_io))
        .route("/cpu-io-no-db", routing::get(cpu_io))
}

async fn cpu_io(
    State(state): State<ServiceState>,
    query: Result<Query<WorkloadRequest>, QueryRejection>,
) -> ApiResult<Json<WorkloadResult>> {
    let Query(request) = query.map_err(|rejection| ApiError::Client(rejection.body_text()))?;
    let result = state.service.run(request).await?;
    Ok(Json(result))
}
