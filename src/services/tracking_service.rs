use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::{
    codes::allocate_unique,
    entity::{
        order_tracking::{
            ActiveModel as TrackingActive, Column as TrackingCol, Entity as OrderTracking,
        },
        orders::Entity as Orders,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{self, parse_order_status, parse_payment_status},
    response::{ApiResponse, Meta},
    state::AppState,
    status::{OrderStatus, PaymentStatus},
};

/// Create the tracking record for an order, or return the existing one.
///
/// Create-if-absent: calling this twice for the same order never yields two
/// records or burns a second code. The bool reports whether a record was
/// created by this call.
pub async fn ensure_tracking(
    state: &AppState,
    order_id: Uuid,
) -> AppResult<(models::OrderTracking, bool)> {
    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if let Some(existing) = OrderTracking::find()
        .filter(TrackingCol::OrderId.eq(order.id))
        .one(&state.orm)
        .await?
    {
        return Ok((models::OrderTracking::from_entity(existing)?, false));
    }

    let orm = state.orm.clone();
    let order_code = allocate_unique(move |candidate| {
        let orm = orm.clone();
        async move {
            let hits = OrderTracking::find()
                .filter(TrackingCol::OrderCode.eq(candidate))
                .count(&orm)
                .await?;
            Ok(hits > 0)
        }
    })
    .await?;

    let tracking = TrackingActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        order_code: Set(order_code),
        payment_status: Set(PaymentStatus::Pending.as_str().into()),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok((models::OrderTracking::from_entity(tracking)?, true))
}

pub async fn create_tracking(
    state: &AppState,
    order_id: Uuid,
) -> AppResult<ApiResponse<models::OrderTracking>> {
    let (tracking, created) = ensure_tracking(state, order_id).await?;
    let message = if created {
        "Tracking created"
    } else {
        "Tracking already exists"
    };
    Ok(ApiResponse::success(message, tracking, Some(Meta::empty())))
}

/// Tracking detail is withheld until the seller has committed to the order:
/// only confirmed, shipped and cancelled orders expose their code here.
pub async fn get_tracking_for_order(
    state: &AppState,
    _user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<models::OrderTracking>> {
    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let status = parse_order_status(&order.status)?;
    if !matches!(
        status,
        OrderStatus::Confirmed | OrderStatus::Shipped | OrderStatus::Cancelled
    ) {
        return Err(AppError::NotFound);
    }

    let tracking = OrderTracking::find()
        .filter(TrackingCol::OrderId.eq(order.id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success(
        "Tracking",
        models::OrderTracking::from_entity(tracking)?,
        Some(Meta::empty()),
    ))
}

/// Flip a tracking record to Paid. Re-marking a Paid record is a no-op
/// success; crediting the seller is a separate, caller-coordinated step.
pub async fn mark_paid(state: &AppState, order_code: &str) -> AppResult<models::OrderTracking> {
    let tracking = OrderTracking::find()
        .filter(TrackingCol::OrderCode.eq(order_code))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if parse_payment_status(&tracking.payment_status)? == PaymentStatus::Paid {
        return models::OrderTracking::from_entity(tracking);
    }

    let mut active: TrackingActive = tracking.into();
    active.payment_status = Set(PaymentStatus::Paid.as_str().into());
    active.updated_at = Set(Utc::now().into());
    let updated = active.update(&state.orm).await?;

    models::OrderTracking::from_entity(updated)
}
