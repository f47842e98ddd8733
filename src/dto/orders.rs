use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, OrderItem};

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutItem {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    pub items: Vec<CheckoutItem>,
    pub delivery_address: String,
    pub shipping_fee: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// A checkout produces one order per distinct seller.
#[derive(Debug, Serialize, ToSchema)]
pub struct CheckoutResponse {
    pub orders: Vec<OrderWithItems>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

/// An item the seller could not confirm, with the stock that was actually
/// available when the atomic decrement was attempted (0 when the product no
/// longer exists).
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UnfulfilledItem {
    pub item_id: Uuid,
    pub product_id: Uuid,
    pub requested: i32,
    pub available: i32,
}

/// Item-level outcome of an accept operation. Partial success is a normal
/// result, not an error: confirmed and unfulfilled subsets are both reported
/// so buyer and seller can reconcile the remainder.
#[derive(Debug, Serialize, ToSchema)]
pub struct AcceptItemsOutcome {
    pub order: Order,
    pub confirmed: Vec<OrderItem>,
    pub unfulfilled: Vec<UnfulfilledItem>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CancelItemsOutcome {
    pub order: Order,
    pub items: Vec<OrderItem>,
}
