use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{OrderList, OrderWithItems},
    entity::{
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderItem, parse_item_status, parse_order_status},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::tracking_service,
    state::AppState,
    status::{ItemStatus, OrderStatus},
};

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination.normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        let status: OrderStatus = status
            .parse()
            .map_err(|_| AppError::BadRequest("Invalid order status".into()))?;
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }

    let mut finder = Orders::find().filter(condition);

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    let meta = Meta::new(page, limit, total);

    Ok(ApiResponse::success(
        "Orders",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user)?;
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(OrderItem::from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "Order found",
        OrderWithItems {
            order: Order::from_entity(order)?,
            items,
        },
        Some(Meta::empty()),
    ))
}

/// Move an order along the shipping state machine.
///
/// The transition map is the single authority; anything it rejects comes
/// back as an invalid-transition error. Entering `shipped` creates the
/// tracking record if the order does not have one yet, and entering
/// `cancelled` closes out any still-actionable items so order and item
/// statuses stay consistent.
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    requested: OrderStatus,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;

    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let current = parse_order_status(&order.status)?;
    if !current.can_transition_to(requested) {
        return Err(AppError::InvalidTransition {
            from: current,
            to: requested,
        });
    }

    if requested == OrderStatus::Shipped {
        tracking_service::ensure_tracking(state, order.id).await?;
    }

    if requested == OrderStatus::Cancelled {
        let items = OrderItems::find()
            .filter(OrderItemCol::OrderId.eq(order.id))
            .all(&state.orm)
            .await?;
        for item in items {
            let item_status = parse_item_status(&item.status)?;
            if matches!(item_status, ItemStatus::Pending | ItemStatus::Confirmed) {
                if item_status == ItemStatus::Confirmed {
                    sqlx::query("UPDATE products SET stock = stock + $2 WHERE id = $1")
                        .bind(item.product_id)
                        .bind(item.quantity)
                        .execute(&state.pool)
                        .await?;
                }
                let mut active: OrderItemActive = item.into();
                active.status = Set(ItemStatus::Cancelled.as_str().into());
                active.update(&state.orm).await?;
            }
        }
    }

    let mut active: OrderActive = order.into();
    active.status = Set(requested.as_str().into());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_status_update",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "status": order.status })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order updated",
        Order::from_entity(order)?,
        Some(Meta::empty()),
    ))
}
