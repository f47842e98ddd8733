use std::collections::BTreeMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{
        AcceptItemsOutcome, CancelItemsOutcome, CheckoutRequest, CheckoutResponse, OrderList,
        OrderWithItems, UnfulfilledItem,
    },
    entity::{
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        products::Entity as Products,
        users::Entity as Users,
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ROLE_ADMIN, ensure_buyer, ensure_seller},
    models::{Order, OrderItem, parse_item_status, parse_order_status},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
    status::{ItemStatus, OrderStatus, derive_order_status},
};

/// Create one order per distinct seller out of the requested items.
///
/// Item prices and both addresses are snapshotted here and never re-derived.
/// Stock is only validated at this point; the actual reservation happens when
/// the seller accepts.
pub async fn checkout(
    state: &AppState,
    user: &AuthUser,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<CheckoutResponse>> {
    ensure_buyer(user)?;

    if payload.items.is_empty() {
        return Err(AppError::BadRequest("No items to order".into()));
    }
    if payload.delivery_address.trim().is_empty() {
        return Err(AppError::BadRequest("Delivery address is required".into()));
    }
    if payload.shipping_fee < 0 {
        return Err(AppError::BadRequest("Shipping fee must not be negative".into()));
    }

    // Resolve products and split the requested items per seller.
    let mut per_seller: BTreeMap<Uuid, Vec<(Uuid, i32, i64)>> = BTreeMap::new();
    for item in &payload.items {
        if item.quantity <= 0 {
            return Err(AppError::BadRequest("Quantity must be positive".into()));
        }
        let product = Products::find_by_id(item.product_id)
            .one(&state.orm)
            .await?
            .ok_or_else(|| {
                AppError::BadRequest(format!("Unknown product {}", item.product_id))
            })?;
        if product.stock < item.quantity {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for product {}",
                product.id
            )));
        }
        per_seller
            .entry(product.seller_id)
            .or_default()
            .push((product.id, item.quantity, product.price));
    }

    let mut orders = Vec::with_capacity(per_seller.len());

    for (seller_id, items) in per_seller {
        let seller = Users::find_by_id(seller_id)
            .one(&state.orm)
            .await?
            .ok_or_else(|| AppError::BadRequest(format!("Unknown seller {seller_id}")))?;
        let seller_address = seller.address.unwrap_or_default();

        let total_price: i64 = items
            .iter()
            .map(|(_, quantity, price)| *price * (*quantity as i64))
            .sum::<i64>()
            + payload.shipping_fee;

        let txn = state.orm.begin().await?;

        let order = OrderActive {
            id: Set(Uuid::new_v4()),
            buyer_id: Set(user.user_id),
            seller_id: Set(seller_id),
            total_price: Set(total_price),
            shipping_fee: Set(payload.shipping_fee),
            status: Set(OrderStatus::Pending.as_str().into()),
            delivery_address: Set(payload.delivery_address.clone()),
            seller_address: Set(seller_address),
            settled_at: Set(None),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&txn)
        .await?;

        let mut order_items = Vec::with_capacity(items.len());
        for (product_id, quantity, price) in items {
            let item = OrderItemActive {
                id: Set(Uuid::new_v4()),
                order_id: Set(order.id),
                product_id: Set(product_id),
                quantity: Set(quantity),
                price_at_order: Set(price),
                status: Set(ItemStatus::Pending.as_str().into()),
                created_at: NotSet,
            }
            .insert(&txn)
            .await?;
            order_items.push(OrderItem::from_entity(item)?);
        }

        txn.commit().await?;

        orders.push(OrderWithItems {
            order: Order::from_entity(order)?,
            items: order_items,
        });
    }

    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.order.id).collect();
    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "checkout",
        Some("orders"),
        Some(serde_json::json!({ "order_ids": order_ids })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Checkout success",
        CheckoutResponse { orders },
        Some(Meta::empty()),
    ))
}

/// Confirm every pending item the stock pool can still cover.
///
/// Each reservation is a single conditional decrement, so concurrent accepts
/// against the same product can never over-allocate. Items that lose the race
/// stay pending and are reported with the stock that was left.
pub async fn accept_pending_items(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<AcceptItemsOutcome>> {
    ensure_seller(user)?;

    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if order.seller_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    let status = parse_order_status(&order.status)?;
    if !matches!(status, OrderStatus::Pending | OrderStatus::Confirmed) {
        return Err(AppError::InvalidTransition {
            from: status,
            to: OrderStatus::Confirmed,
        });
    }

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?;

    let mut confirmed = Vec::new();
    let mut unfulfilled = Vec::new();
    let mut statuses = Vec::with_capacity(items.len());

    for item in items {
        let item_status = parse_item_status(&item.status)?;
        if item_status != ItemStatus::Pending {
            statuses.push(item_status);
            continue;
        }

        // Reserve stock with a single conditional decrement; losing the
        // condition means another accept got there first or the pool was
        // already short.
        let reserved = sqlx::query(
            "UPDATE products SET stock = stock - $2 WHERE id = $1 AND stock >= $2",
        )
        .bind(item.product_id)
        .bind(item.quantity)
        .execute(&state.pool)
        .await?
        .rows_affected()
            == 1;

        if reserved {
            let mut active: OrderItemActive = item.into();
            active.status = Set(ItemStatus::Confirmed.as_str().into());
            let updated = active.update(&state.orm).await?;
            statuses.push(ItemStatus::Confirmed);
            confirmed.push(OrderItem::from_entity(updated)?);
        } else {
            let available: Option<(i32,)> =
                sqlx::query_as("SELECT stock FROM products WHERE id = $1")
                    .bind(item.product_id)
                    .fetch_optional(&state.pool)
                    .await?;
            unfulfilled.push(UnfulfilledItem {
                item_id: item.id,
                product_id: item.product_id,
                requested: item.quantity,
                available: available.map_or(0, |row| row.0),
            });
            statuses.push(ItemStatus::Pending);
        }
    }

    if confirmed.is_empty() {
        // Nothing was reserved, so the order (and the stock pool) are
        // untouched; report the shortfall per item.
        return Err(AppError::InsufficientStock(unfulfilled));
    }

    let derived = derive_order_status(&statuses);
    let mut active: OrderActive = order.into();
    active.status = Set(derived.as_str().into());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_items_accepted",
        Some("orders"),
        Some(serde_json::json!({
            "order_id": order.id,
            "confirmed": confirmed.len(),
            "unfulfilled": unfulfilled.len(),
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Items accepted",
        AcceptItemsOutcome {
            order: Order::from_entity(order)?,
            confirmed,
            unfulfilled,
        },
        Some(Meta::empty()),
    ))
}

/// Cancel every still-actionable item on the seller's order.
///
/// Completed items are untouched and orders past `confirmed` cannot be
/// cancelled at all; `cancelled` is unreachable from `completed`.
pub async fn cancel_items(
    state: &AppState,
    user: &AuthUser,
    order_id: Uuid,
) -> AppResult<ApiResponse<CancelItemsOutcome>> {
    ensure_seller(user)?;

    let order = Orders::find_by_id(order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if order.seller_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    let status = parse_order_status(&order.status)?;
    if !status.can_transition_to(OrderStatus::Cancelled) {
        return Err(AppError::InvalidTransition {
            from: status,
            to: OrderStatus::Cancelled,
        });
    }

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?;

    let mut cancelled_count = 0usize;
    let mut statuses = Vec::with_capacity(items.len());
    let mut remaining = Vec::with_capacity(items.len());

    for item in items {
        let item_status = parse_item_status(&item.status)?;
        if matches!(item_status, ItemStatus::Pending | ItemStatus::Confirmed) {
            // Confirmed items hold reserved stock; release it before the
            // status flip.
            if item_status == ItemStatus::Confirmed {
                sqlx::query("UPDATE products SET stock = stock + $2 WHERE id = $1")
                    .bind(item.product_id)
                    .bind(item.quantity)
                    .execute(&state.pool)
                    .await?;
            }
            let mut active: OrderItemActive = item.into();
            active.status = Set(ItemStatus::Cancelled.as_str().into());
            let updated = active.update(&state.orm).await?;
            statuses.push(ItemStatus::Cancelled);
            remaining.push(OrderItem::from_entity(updated)?);
            cancelled_count += 1;
        } else {
            statuses.push(item_status);
            remaining.push(OrderItem::from_entity(item)?);
        }
    }

    if cancelled_count == 0 {
        return Err(AppError::BadRequest("No cancellable items".into()));
    }

    let derived = derive_order_status(&statuses);
    let mut active: OrderActive = order.into();
    active.status = Set(derived.as_str().into());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "order_items_cancelled",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id, "cancelled": cancelled_count })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Items cancelled",
        CancelItemsOutcome {
            order: Order::from_entity(order)?,
            items: remaining,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    list_filtered(state, OrderCol::BuyerId.eq(user.user_id), query).await
}

pub async fn list_seller_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_seller(user)?;
    list_filtered(state, OrderCol::SellerId.eq(user.user_id), query).await
}

async fn list_filtered(
    state: &AppState,
    owner: sea_orm::sea_query::SimpleExpr,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all().add(owner);
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        let status: OrderStatus = status
            .parse()
            .map_err(|_| AppError::BadRequest("Invalid order status".into()))?;
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
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
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let involved = order.buyer_id == user.user_id
        || order.seller_id == user.user_id
        || user.role == ROLE_ADMIN;
    if !involved {
        return Err(AppError::NotFound);
    }

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(OrderItem::from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: Order::from_entity(order)?,
            items,
        },
        Some(Meta::empty()),
    ))
}
