use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::delivery::DeliveryList,
    entity::{
        order_deliveries::{
            ActiveModel as DeliveryActive, Column as DeliveryCol, Entity as OrderDeliveries,
        },
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        order_tracking::{Column as TrackingCol, Entity as OrderTracking},
        orders::{ActiveModel as OrderActive, Entity as Orders},
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ROLE_ADMIN, ROLE_RIDER, ensure_admin, ensure_rider},
    models::{self, parse_item_status, parse_order_status},
    response::{ApiResponse, Meta},
    state::AppState,
    status::{ItemStatus, OrderStatus},
};

/// Bind a courier to a shipped order and move it out for delivery.
///
/// At most one courier per order; the binding is immutable once created.
pub async fn assign_rider(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    rider_id: Uuid,
) -> AppResult<ApiResponse<models::OrderDelivery>> {
    ensure_admin(user)?;

    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let status = parse_order_status(&order.status)?;
    if status != OrderStatus::Shipped {
        return Err(AppError::InvalidTransition {
            from: status,
            to: OrderStatus::OutForDelivery,
        });
    }

    let tracking = OrderTracking::find()
        .filter(TrackingCol::OrderId.eq(order.id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let existing = OrderDeliveries::find()
        .filter(DeliveryCol::OrderId.eq(order.id))
        .one(&state.orm)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("Order already has a rider assigned".into()));
    }

    let rider = Users::find_by_id(rider_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("Unknown rider".into()))?;
    if rider.role != ROLE_RIDER {
        return Err(AppError::BadRequest("Assignee is not a rider".into()));
    }

    let delivery = DeliveryActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        tracking_id: Set(tracking.id),
        rider_id: Set(rider.id),
        is_delivered: Set(false),
        delivery_proof: Set(None),
        delivered_at: Set(None),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::OutForDelivery.as_str().into());
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "rider_assigned",
        Some("order_deliveries"),
        Some(serde_json::json!({ "order_id": order_id, "rider_id": rider_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Rider assigned",
        models::OrderDelivery::from_entity(delivery),
        Some(Meta::empty()),
    ))
}

/// Record proof of delivery. One-way: the flip to delivered happens exactly
/// once and there is no way back to undelivered.
pub async fn capture_delivery_proof(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
    proof_image: &str,
) -> AppResult<ApiResponse<models::OrderDelivery>> {
    if proof_image.trim().is_empty() {
        return Err(AppError::BadRequest("Missing proof image".into()));
    }

    let delivery = OrderDeliveries::find()
        .filter(DeliveryCol::OrderId.eq(order_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if user.role != ROLE_ADMIN && delivery.rider_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    // Single conditional update so a double capture loses the race instead
    // of overwriting the first proof.
    let flipped = sqlx::query(
        r#"
        UPDATE order_deliveries
        SET is_delivered = TRUE, delivery_proof = $2, delivered_at = now()
        WHERE id = $1 AND is_delivered = FALSE
        "#,
    )
    .bind(delivery.id)
    .bind(proof_image)
    .execute(&state.pool)
    .await?
    .rows_affected()
        == 1;

    if !flipped {
        return Err(AppError::Conflict("Delivery proof already captured".into()));
    }

    let updated = OrderDeliveries::find_by_id(delivery.id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "delivery_proof_captured",
        Some("order_deliveries"),
        Some(serde_json::json!({ "order_id": order_id, "delivery_id": delivery.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Delivery recorded",
        models::OrderDelivery::from_entity(updated),
        Some(Meta::empty()),
    ))
}

/// Close out a delivered order. This is the trigger point after which the
/// seller's balance credit becomes eligible.
pub async fn mark_completed(
    state: &AppState,
    user: &AuthUser,
    delivery_id: Uuid,
) -> AppResult<ApiResponse<models::OrderDelivery>> {
    ensure_admin(user)?;

    // A missing assignment and an undelivered one look the same from here.
    let delivery = OrderDeliveries::find_by_id(delivery_id)
        .filter(DeliveryCol::IsDelivered.eq(true))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let order = Orders::find_by_id(delivery.order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let status = parse_order_status(&order.status)?;
    if !status.can_transition_to(OrderStatus::Completed) {
        return Err(AppError::InvalidTransition {
            from: status,
            to: OrderStatus::Completed,
        });
    }

    // Settle the item ledger: fulfilled items complete, anything still
    // actionable is closed out.
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?;
    for item in items {
        let next = match parse_item_status(&item.status)? {
            ItemStatus::Confirmed => ItemStatus::Completed,
            ItemStatus::Pending => ItemStatus::Cancelled,
            other => other,
        };
        if next.as_str() != item.status {
            let mut active: OrderItemActive = item.into();
            active.status = Set(next.as_str().into());
            active.update(&state.orm).await?;
        }
    }

    let order_id = order.id;
    let mut active: OrderActive = order.into();
    active.status = Set(OrderStatus::Completed.as_str().into());
    active.updated_at = Set(Utc::now().into());
    active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_completed",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order_id, "delivery_id": delivery_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let delivery = OrderDeliveries::find_by_id(delivery_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success(
        "Order completed",
        models::OrderDelivery::from_entity(delivery),
        Some(Meta::empty()),
    ))
}

pub async fn list_rider_deliveries(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<DeliveryList>> {
    ensure_rider(user)?;

    let items = OrderDeliveries::find()
        .filter(DeliveryCol::RiderId.eq(user.user_id))
        .order_by_desc(DeliveryCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(models::OrderDelivery::from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Deliveries",
        DeliveryList { items },
        Some(Meta::empty()),
    ))
}
