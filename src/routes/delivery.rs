use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::delivery::{AssignRiderRequest, DeliveryList, DeliveryProofRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::OrderDelivery,
    response::ApiResponse,
    services::delivery_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/mine", get(list_my_deliveries))
        .route("/{order_id}/assign-rider", post(assign_rider))
        .route("/delivery-status/{order_id}", put(capture_proof))
        .route("/mark-completed/{delivery_id}", put(mark_completed))
}

#[utoipa::path(
    post,
    path = "/api/order-to-deliver/{order_id}/assign-rider",
    params(
        ("order_id" = Uuid, Path, description = "Order ID")
    ),
    request_body = AssignRiderRequest,
    responses(
        (status = 201, description = "Courier bound, order out for delivery", body = ApiResponse<OrderDelivery>),
        (status = 400, description = "Order not shipped or assignee not a rider"),
        (status = 409, description = "Rider already assigned"),
    ),
    security(("bearer_auth" = [])),
    tag = "Delivery"
)]
pub async fn assign_rider(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<AssignRiderRequest>,
) -> AppResult<Json<ApiResponse<OrderDelivery>>> {
    let resp = delivery_service::assign_rider(&state, &user, order_id, payload.rider_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/order-to-deliver/delivery-status/{order_id}",
    params(
        ("order_id" = Uuid, Path, description = "Order ID")
    ),
    request_body = DeliveryProofRequest,
    responses(
        (status = 200, description = "Proof recorded", body = ApiResponse<OrderDelivery>),
        (status = 400, description = "Missing proof image"),
        (status = 409, description = "Already delivered"),
    ),
    security(("bearer_auth" = [])),
    tag = "Delivery"
)]
pub async fn capture_proof(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_id): Path<Uuid>,
    Json(payload): Json<DeliveryProofRequest>,
) -> AppResult<Json<ApiResponse<OrderDelivery>>> {
    let resp =
        delivery_service::capture_delivery_proof(&state, &user, order_id, &payload.proof_image)
            .await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/order-to-deliver/mark-completed/{delivery_id}",
    params(
        ("delivery_id" = Uuid, Path, description = "Delivery ID")
    ),
    responses(
        (status = 200, description = "Order completed", body = ApiResponse<OrderDelivery>),
        (status = 404, description = "Unknown delivery or not delivered yet"),
    ),
    security(("bearer_auth" = [])),
    tag = "Delivery"
)]
pub async fn mark_completed(
    State(state): State<AppState>,
    user: AuthUser,
    Path(delivery_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderDelivery>>> {
    let resp = delivery_service::mark_completed(&state, &user, delivery_id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/order-to-deliver/mine",
    tag = "Delivery",
    security(("bearer_auth" = []))
)]
pub async fn list_my_deliveries(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<DeliveryList>>> {
    let resp = delivery_service::list_rider_deliveries(&state, &user).await?;
    Ok(Json(resp))
}
