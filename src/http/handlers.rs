use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::time::Instant;

use crate::chain::messages::{ClearAdminRequest, IssueTokenRequest, Operation, TransferAdminRequest};
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::service::{NodeStatus, OperationResponse};

#[derive(Serialize)]
pub struct Liveness {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health() -> Json<Liveness> {
    Json(Liveness {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn status(State(state): State<AppState>) -> (StatusCode, Json<NodeStatus>) {
    let report = state.service.node_status().await;
    let code = if report.reachable {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(report))
}

pub async fn issue_token(
    State(state): State<AppState>,
    payload: Result<Json<IssueTokenRequest>, JsonRejection>,
) -> Response {
    let start = Instant::now();
    let result = match payload {
        Ok(Json(req)) => state.service.issue_token(&req).await.map_err(ApiError::from),
        Err(rejection) => Err(rejection.into()),
    };
    respond(Operation::IssueToken, result, start)
}

pub async fn transfer_admin(
    State(state): State<AppState>,
    payload: Result<Json<TransferAdminRequest>, JsonRejection>,
) -> Response {
    let start = Instant::now();
    let result = match payload {
        Ok(Json(req)) => state.service.transfer_admin(&req).await.map_err(ApiError::from),
        Err(rejection) => Err(rejection.into()),
    };
    respond(Operation::TransferAdmin, result, start)
}

pub async fn clear_admin(
    State(state): State<AppState>,
    payload: Result<Json<ClearAdminRequest>, JsonRejection>,
) -> Response {
    let start = Instant::now();
    let result = match payload {
        Ok(Json(req)) => state.service.clear_admin(&req).await.map_err(ApiError::from),
        Err(rejection) => Err(rejection.into()),
    };
    respond(Operation::ClearAdmin, result, start)
}

fn respond(
    operation: Operation,
    result: Result<OperationResponse, ApiError>,
    start: Instant,
) -> Response {
    let response = match result {
        Ok(body) => (StatusCode::OK, Json(body)).into_response(),
        Err(err) => {
            let status = err.status();
            if status.is_server_error() {
                tracing::error!(
                    operation = %operation,
                    kind = err.0.kind(),
                    error = %err.0,
                    "Operation failed"
                );
            } else {
                tracing::warn!(
                    operation = %operation,
                    kind = err.0.kind(),
                    error = %err.0,
                    "Operation rejected"
                );
            }
            err.into_response()
        }
    };
    metrics::record_request(operation.as_str(), response.status().as_u16(), start);
    response
}

