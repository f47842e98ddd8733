use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::OrderDelivery;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AssignRiderRequest {
    pub rider_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DeliveryProofRequest {
    /// Reference to the captured proof-of-delivery image.
    pub proof_image: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DeliveryList {
    pub items: Vec<OrderDelivery>,
}
