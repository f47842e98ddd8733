use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};

use crate::{
    dto::balance::{WithdrawRequest, WithdrawalList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::{BalanceWithdrawal, SellerBalance},
    response::ApiResponse,
    services::balance_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_balance))
        .route("/", get(get_balance))
        .route("/withdraw", post(request_withdrawal))
        .route("/withdrawals", get(list_withdrawals))
}

#[utoipa::path(
    post,
    path = "/api/seller-balance",
    responses(
        (status = 201, description = "Ledger account with fresh bank number", body = ApiResponse<SellerBalance>),
        (status = 409, description = "Balance already exists"),
    ),
    security(("bearer_auth" = [])),
    tag = "Balance"
)]
pub async fn create_balance(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<SellerBalance>>> {
    let resp = balance_service::create_balance(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/seller-balance",
    tag = "Balance",
    security(("bearer_auth" = []))
)]
pub async fn get_balance(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<SellerBalance>>> {
    let resp = balance_service::get_balance(&state, &user).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/seller-balance/withdraw",
    request_body = WithdrawRequest,
    responses(
        (status = 201, description = "Pending withdrawal", body = ApiResponse<BalanceWithdrawal>),
        (status = 400, description = "Non-positive amount or insufficient balance"),
    ),
    security(("bearer_auth" = [])),
    tag = "Balance"
)]
pub async fn request_withdrawal(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<WithdrawRequest>,
) -> AppResult<Json<ApiResponse<BalanceWithdrawal>>> {
    let resp = balance_service::request_withdrawal(&state, &user, payload.amount).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/seller-balance/withdrawals",
    tag = "Balance",
    security(("bearer_auth" = []))
)]
pub async fn list_withdrawals(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<WithdrawalList>>> {
    let resp = balance_service::list_withdrawals(&state, &user).await?;
    Ok(Json(resp))
}
