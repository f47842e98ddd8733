use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch, post, put},
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::balance::{ReconcileReport, SettlementOutcome, SettlementRequest, WithdrawalDecisionRequest},
    dto::orders::{OrderList, OrderWithItems},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{BalanceWithdrawal, Order, OrderTracking},
    response::ApiResponse,
    routes::params::OrderListQuery,
    services::{admin_service, balance_service, tracking_service},
    state::AppState,
    status::OrderStatus,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_all_orders))
        .route("/orders/{id}", get(get_order_admin))
        .route("/orders/{id}/status", patch(update_order_status))
        .route(
            "/order-tracking/{order_code}/payment-status",
            patch(mark_tracking_paid),
        )
        .route("/seller-balance/update", patch(credit_seller_balance))
        .route(
            "/seller-balance/withdrawal/{id}/status",
            put(decide_withdrawal),
        )
        .route("/settlements/reconcile", post(reconcile_settlements))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("sort_order" = Option<String>, Query, description = "Sort order: asc, desc")
    ),
    responses(
    (status = 200, description = "Get all orders (admin only)", body = ApiResponse<OrderList>),
    (status = 403, description = "Forbidden"),
    (status = 500, description = "Internal Server Error"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = admin_service::list_all_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/{id}",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    responses(
    (status = 200, description = "Get any order with items (admin only)", body = ApiResponse<OrderWithItems>),
    (status = 404, description = "Not Found"),
    (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_order_admin(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithItems>>> {
    let resp = admin_service::get_order_admin(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/orders/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Order ID")
    ),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Update order status", body = ApiResponse<Order>),
        (status = 400, description = "Unknown status or transition not allowed"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Order>>> {
    let requested: OrderStatus = payload
        .status
        .parse()
        .map_err(|_| AppError::BadRequest("Invalid order status".into()))?;
    let resp = admin_service::update_order_status(&state, &user, id, requested).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/order-tracking/{order_code}/payment-status",
    params(
        ("order_code" = String, Path, description = "Public order code")
    ),
    responses(
        (status = 200, description = "Tracking marked Paid", body = ApiResponse<OrderTracking>),
        (status = 404, description = "Unknown order code"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn mark_tracking_paid(
    State(state): State<AppState>,
    user: AuthUser,
    Path(order_code): Path<String>,
) -> AppResult<Json<ApiResponse<OrderTracking>>> {
    ensure_admin(&user)?;
    let tracking = tracking_service::mark_paid(&state, &order_code).await?;
    Ok(Json(ApiResponse::success("Tracking paid", tracking, None)))
}

#[utoipa::path(
    patch,
    path = "/api/admin/seller-balance/update",
    request_body = SettlementRequest,
    responses(
        (status = 200, description = "Seller credited net of the flat fee", body = ApiResponse<SettlementOutcome>),
        (status = 400, description = "Order not completed"),
        (status = 404, description = "Tracking or balance not found"),
        (status = 409, description = "Order already settled"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn credit_seller_balance(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<SettlementRequest>,
) -> AppResult<Json<ApiResponse<SettlementOutcome>>> {
    let resp = balance_service::credit_on_delivery(&state, &user, &payload.order_code).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/seller-balance/withdrawal/{id}/status",
    params(
        ("id" = Uuid, Path, description = "Withdrawal ID")
    ),
    request_body = WithdrawalDecisionRequest,
    responses(
        (status = 200, description = "Withdrawal processed", body = ApiResponse<BalanceWithdrawal>),
        (status = 400, description = "Insufficient balance at approval time"),
        (status = 409, description = "Withdrawal already processed"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn decide_withdrawal(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<WithdrawalDecisionRequest>,
) -> AppResult<Json<ApiResponse<BalanceWithdrawal>>> {
    let resp = balance_service::decide_withdrawal(&state, &user, id, payload.status).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/settlements/reconcile",
    responses(
        (status = 200, description = "Stuck settlements finished", body = ApiResponse<ReconcileReport>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn reconcile_settlements(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<ReconcileReport>>> {
    let resp = balance_service::reconcile_settlements(&state, &user).await?;
    Ok(Json(resp))
}
