use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::tracking::CreateTrackingRequest,
    error::AppResult,
    middleware::auth::{AuthUser, ensure_admin},
    models::OrderTracking,
    response::ApiResponse,
    services::tracking_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_tracking))
        .route("/{order_id}", get(get_tracking))
}

#[utoipa::path(
    post,
    path = "/api/order-tracking",
    request_body = CreateTrackingRequest,
    responses(
        (status = 201, description = "Tracking with fresh order code", body = ApiResponse<OrderTracking>),
        (status = 404, description = "Order not found"),
        (status = 500, description = "Code space exhausted"),
    ),
    security(("bearer_auth" = [])),
    tag = "Tracking"
)]
pub async fn create_tracking(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateTrackingRequest>,
) -> AppResult<Json<ApiResponse<OrderTracking>>> {
    ensure_admin(&user)?;
    let resp = tracking_service::create_tracking(&state, payload.order_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/order-tracking/{order_id}",
    params(
        ("order_id" = Uuid, Path, description = "Order ID")
    ),
    responses(
        (status = 200, description = "Tracking detail", body = ApiResponse<OrderTracking>),
        (status = 404, description = "No tracking, or order not yet committed"),
    ),
    security(("bearer_auth" = [])),
    tag = "Tracking"
)]
pub async fn get_tracking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderTracking>>> {
    let resp = tracking_service::get_tracking_for_order(&state, &user, order_id).await?;
    Ok(Json(resp))
}
