use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity;
use crate::error::{AppError, AppResult};
use crate::status::{InvalidStatus, ItemStatus, OrderStatus, PaymentStatus, WithdrawalStatus};

// API-facing models. Status columns are persisted as strings; the
// `from_entity` constructors are the single place those strings are parsed
// back into the typed enums, so a corrupt column surfaces as an internal
// error instead of leaking into handlers.

fn corrupt_status(err: InvalidStatus) -> AppError {
    AppError::Internal(anyhow::anyhow!("corrupt status column: {err}"))
}

/// Parse a persisted order status column.
pub fn parse_order_status(raw: &str) -> AppResult<OrderStatus> {
    raw.parse().map_err(corrupt_status)
}

/// Parse a persisted item status column.
pub fn parse_item_status(raw: &str) -> AppResult<ItemStatus> {
    raw.parse().map_err(corrupt_status)
}

/// Parse a persisted payment status column.
pub fn parse_payment_status(raw: &str) -> AppResult<PaymentStatus> {
    raw.parse().map_err(corrupt_status)
}

/// Parse a persisted withdrawal status column.
pub fn parse_withdrawal_status(raw: &str) -> AppResult<WithdrawalStatus> {
    raw.parse().map_err(corrupt_status)
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub role: String,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn from_entity(model: entity::users::Model) -> Self {
        User {
            id: model.id,
            email: model.email,
            role: model.role,
            address: model.address,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
}

impl Product {
    pub fn from_entity(model: entity::products::Model) -> Self {
        Product {
            id: model.id,
            seller_id: model.seller_id,
            name: model.name,
            description: model.description,
            price: model.price,
            stock: model.stock,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub buyer_id: Uuid,
    pub seller_id: Uuid,
    pub total_price: i64,
    pub shipping_fee: i64,
    pub status: OrderStatus,
    pub delivery_address: String,
    pub seller_address: String,
    pub settled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn from_entity(model: entity::orders::Model) -> AppResult<Self> {
        Ok(Order {
            id: model.id,
            buyer_id: model.buyer_id,
            seller_id: model.seller_id,
            total_price: model.total_price,
            shipping_fee: model.shipping_fee,
            status: model.status.parse().map_err(corrupt_status)?,
            delivery_address: model.delivery_address,
            seller_address: model.seller_address,
            settled_at: model.settled_at.map(|dt| dt.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub price_at_order: i64,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    pub fn from_entity(model: entity::order_items::Model) -> AppResult<Self> {
        Ok(OrderItem {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            quantity: model.quantity,
            price_at_order: model.price_at_order,
            status: model.status.parse().map_err(corrupt_status)?,
            created_at: model.created_at.with_timezone(&Utc),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderTracking {
    pub id: Uuid,
    pub order_id: Uuid,
    pub order_code: String,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderTracking {
    pub fn from_entity(model: entity::order_tracking::Model) -> AppResult<Self> {
        Ok(OrderTracking {
            id: model.id,
            order_id: model.order_id,
            order_code: model.order_code,
            payment_status: model.payment_status.parse().map_err(corrupt_status)?,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderDelivery {
    pub id: Uuid,
    pub order_id: Uuid,
    pub tracking_id: Uuid,
    pub rider_id: Uuid,
    pub is_delivered: bool,
    pub delivery_proof: Option<String>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl OrderDelivery {
    pub fn from_entity(model: entity::order_deliveries::Model) -> Self {
        OrderDelivery {
            id: model.id,
            order_id: model.order_id,
            tracking_id: model.tracking_id,
            rider_id: model.rider_id,
            is_delivered: model.is_delivered,
            delivery_proof: model.delivery_proof,
            delivered_at: model.delivered_at.map(|dt| dt.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SellerBalance {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub current_balance: i64,
    pub bank_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SellerBalance {
    pub fn from_entity(model: entity::seller_balances::Model) -> Self {
        SellerBalance {
            id: model.id,
            seller_id: model.seller_id,
            current_balance: model.current_balance,
            bank_number: model.bank_number,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BalanceWithdrawal {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub amount: i64,
    pub status: WithdrawalStatus,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl BalanceWithdrawal {
    pub fn from_entity(model: entity::balance_withdrawals::Model) -> AppResult<Self> {
        Ok(BalanceWithdrawal {
            id: model.id,
            seller_id: model.seller_id,
            amount: model.amount,
            status: model.status.parse().map_err(corrupt_status)?,
            processed_at: model.processed_at.map(|dt| dt.with_timezone(&Utc)),
            created_at: model.created_at.with_timezone(&Utc),
        })
    }
}
