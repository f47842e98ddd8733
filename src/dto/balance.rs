use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{BalanceWithdrawal, SellerBalance};
use crate::status::WithdrawalStatus;

#[derive(Debug, Deserialize, ToSchema)]
pub struct WithdrawRequest {
    pub amount: i64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct WithdrawalDecisionRequest {
    /// Target status; only `approved` and `rejected` are accepted here.
    pub status: WithdrawalStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WithdrawalList {
    pub items: Vec<BalanceWithdrawal>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SettlementRequest {
    pub order_code: String,
}

/// Result of the settlement credit. The credit and the tracking mark-paid
/// are two separate writes; when the second fails the credit stands and
/// `payment_status_updated` comes back false so the operator can retry.
#[derive(Debug, Serialize, ToSchema)]
pub struct SettlementOutcome {
    pub balance: SellerBalance,
    pub amount_credited: i64,
    pub payment_status_updated: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReconcileReport {
    /// Tracking records that were stuck Pending after a credit and have now
    /// been marked Paid.
    pub marked_paid: Vec<String>,
    /// Completed orders that have not been credited yet; these still need an
    /// operator settlement, the reconciler never credits on its own.
    pub awaiting_credit: Vec<Uuid>,
}
