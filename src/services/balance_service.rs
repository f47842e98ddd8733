use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    codes::allocate_unique,
    dto::balance::{ReconcileReport, SettlementOutcome, WithdrawalList},
    entity::{
        balance_withdrawals::{
            ActiveModel as WithdrawalActive, Column as WithdrawalCol, Entity as BalanceWithdrawals,
        },
        order_tracking::{Column as TrackingCol, Entity as OrderTracking},
        orders::Entity as Orders,
        seller_balances::{
            ActiveModel as BalanceActive, Column as BalanceCol, Entity as SellerBalances,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_seller},
    models::{self, parse_order_status, parse_payment_status, parse_withdrawal_status},
    response::{ApiResponse, Meta},
    services::tracking_service,
    state::AppState,
    status::{OrderStatus, PaymentStatus, WithdrawalStatus},
};

/// Fixed platform cut deducted from the order total before crediting the
/// seller.
pub const SETTLEMENT_FLAT_FEE: i64 = 50;

/// Open the seller's ledger account. One per seller, ever; the bank number
/// shares the order-code shape and uniqueness policy.
pub async fn create_balance(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<models::SellerBalance>> {
    ensure_seller(user)?;

    let existing = SellerBalances::find()
        .filter(BalanceCol::SellerId.eq(user.user_id))
        .one(&state.orm)
        .await?;
    if existing.is_some() {
        return Err(AppError::Conflict("Balance already exists".into()));
    }

    let orm = state.orm.clone();
    let bank_number = allocate_unique(move |candidate| {
        let orm = orm.clone();
        async move {
            let hits = SellerBalances::find()
                .filter(BalanceCol::BankNumber.eq(candidate))
                .count(&orm)
                .await?;
            Ok(hits > 0)
        }
    })
    .await?;

    let balance = BalanceActive {
        id: Set(Uuid::new_v4()),
        seller_id: Set(user.user_id),
        current_balance: Set(0),
        bank_number: Set(bank_number),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "balance_created",
        Some("seller_balances"),
        Some(serde_json::json!({ "balance_id": balance.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Balance created",
        models::SellerBalance::from_entity(balance),
        Some(Meta::empty()),
    ))
}

pub async fn get_balance(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<models::SellerBalance>> {
    ensure_seller(user)?;

    let balance = SellerBalances::find()
        .filter(BalanceCol::SellerId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success(
        "Balance",
        models::SellerBalance::from_entity(balance),
        Some(Meta::empty()),
    ))
}

/// Settle a completed order into the seller's balance.
///
/// Three ordered steps, each a single-row write: claim the order's
/// settlement marker, increment the balance, mark the tracking record Paid.
/// A failure after the credit leaves the credit standing and reports
/// `payment_status_updated: false`; re-running the operation (or the
/// reconciler) finishes the mark-paid without crediting twice.
pub async fn credit_on_delivery(
    state: &AppState,
    user: &AuthUser,
    order_code: &str,
) -> AppResult<ApiResponse<SettlementOutcome>> {
    ensure_admin(user)?;

    let tracking = OrderTracking::find()
        .filter(TrackingCol::OrderCode.eq(order_code))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let order = Orders::find_by_id(tracking.order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let status = parse_order_status(&order.status)?;
    if status != OrderStatus::Completed {
        return Err(AppError::BadRequest(
            "Order has not been completed yet".into(),
        ));
    }

    let balance = SellerBalances::find()
        .filter(BalanceCol::SellerId.eq(order.seller_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let amount = order.total_price - SETTLEMENT_FLAT_FEE;
    if amount < 0 {
        return Err(AppError::BadRequest(
            "Order total is below the platform fee".into(),
        ));
    }

    // Step 1: claim the settlement. Losing the claim means the credit
    // already happened; the only thing possibly left over is the mark-paid.
    let claimed = sqlx::query(
        "UPDATE orders SET settled_at = now(), updated_at = now() \
         WHERE id = $1 AND settled_at IS NULL",
    )
    .bind(order.id)
    .execute(&state.pool)
    .await?
    .rows_affected()
        == 1;

    if !claimed {
        if parse_payment_status(&tracking.payment_status)? == PaymentStatus::Paid {
            return Err(AppError::Conflict("Order already settled".into()));
        }
        // Stuck between steps: finish the mark-paid, credit nothing.
        tracking_service::mark_paid(state, order_code).await?;
        let balance = SellerBalances::find_by_id(balance.id)
            .one(&state.orm)
            .await?
            .ok_or(AppError::NotFound)?;
        return Ok(ApiResponse::success(
            "Settlement recovered",
            SettlementOutcome {
                balance: models::SellerBalance::from_entity(balance),
                amount_credited: 0,
                payment_status_updated: true,
            },
            Some(Meta::empty()),
        ));
    }

    // Step 2: credit the seller, one atomic increment.
    sqlx::query(
        "UPDATE seller_balances \
         SET current_balance = current_balance + $2, updated_at = now() \
         WHERE seller_id = $1",
    )
    .bind(order.seller_id)
    .bind(amount)
    .execute(&state.pool)
    .await?;

    // Step 3: settle the tracking record. Never roll the credit back.
    let payment_status_updated = match tracking_service::mark_paid(state, order_code).await {
        Ok(_) => true,
        Err(err) => {
            tracing::warn!(error = %err, order_code, "credit applied but tracking still Pending");
            false
        }
    };

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "settlement_credit",
        Some("seller_balances"),
        Some(serde_json::json!({
            "order_id": order.id,
            "order_code": order_code,
            "amount": amount,
            "payment_status_updated": payment_status_updated,
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let balance = SellerBalances::find_by_id(balance.id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success(
        "Seller credited",
        SettlementOutcome {
            balance: models::SellerBalance::from_entity(balance),
            amount_credited: amount,
            payment_status_updated,
        },
        Some(Meta::empty()),
    ))
}

/// Finish settlements that stopped between the credit and the mark-paid, and
/// report completed orders that still await an operator credit. The
/// reconciler never credits on its own.
pub async fn reconcile_settlements(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<ReconcileReport>> {
    ensure_admin(user)?;

    let stuck: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT t.order_code
        FROM order_tracking t
        JOIN orders o ON o.id = t.order_id
        WHERE o.settled_at IS NOT NULL AND t.payment_status = 'Pending'
        "#,
    )
    .fetch_all(&state.pool)
    .await?;

    let mut marked_paid = Vec::with_capacity(stuck.len());
    for code in stuck {
        tracking_service::mark_paid(state, &code).await?;
        marked_paid.push(code);
    }

    let awaiting_credit: Vec<Uuid> = sqlx::query_scalar(
        "SELECT id FROM orders WHERE status = 'completed' AND settled_at IS NULL",
    )
    .fetch_all(&state.pool)
    .await?;

    if !marked_paid.is_empty() {
        if let Err(err) = log_audit(
            &state.pool,
            Some(user.user_id),
            "settlements_reconciled",
            Some("order_tracking"),
            Some(serde_json::json!({ "marked_paid": marked_paid })),
        )
        .await
        {
            tracing::warn!(error = %err, "audit log failed");
        }
    }

    Ok(ApiResponse::success(
        "Reconciled",
        ReconcileReport {
            marked_paid,
            awaiting_credit,
        },
        Some(Meta::empty()),
    ))
}

/// File a withdrawal request against the available balance.
///
/// The balance is validated but not reserved here; concurrent requests can
/// oversubscribe it and the conflict is only caught at approval time.
pub async fn request_withdrawal(
    state: &AppState,
    user: &AuthUser,
    amount: i64,
) -> AppResult<ApiResponse<models::BalanceWithdrawal>> {
    ensure_seller(user)?;

    if amount <= 0 {
        return Err(AppError::BadRequest(
            "Withdrawal amount must be positive".into(),
        ));
    }

    let balance = SellerBalances::find()
        .filter(BalanceCol::SellerId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if amount > balance.current_balance {
        return Err(AppError::InsufficientBalance);
    }

    let withdrawal = WithdrawalActive {
        id: Set(Uuid::new_v4()),
        seller_id: Set(user.user_id),
        amount: Set(amount),
        status: Set(WithdrawalStatus::Pending.as_str().into()),
        processed_at: Set(None),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "withdrawal_requested",
        Some("balance_withdrawals"),
        Some(serde_json::json!({ "withdrawal_id": withdrawal.id, "amount": amount })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Withdrawal requested",
        models::BalanceWithdrawal::from_entity(withdrawal)?,
        Some(Meta::empty()),
    ))
}

pub async fn list_withdrawals(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<WithdrawalList>> {
    ensure_seller(user)?;

    let items = BalanceWithdrawals::find()
        .filter(WithdrawalCol::SellerId.eq(user.user_id))
        .order_by_desc(WithdrawalCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(models::BalanceWithdrawal::from_entity)
        .collect::<AppResult<Vec<_>>>()?;

    Ok(ApiResponse::success(
        "Withdrawals",
        WithdrawalList { items },
        Some(Meta::empty()),
    ))
}

/// Approve or reject a pending withdrawal.
///
/// Approval re-validates the balance at decision time: the claim of the
/// pending row and the debit are both single conditional updates, so two
/// concurrent approvals cannot double-spend.
pub async fn decide_withdrawal(
    state: &AppState,
    user: &AuthUser,
    withdrawal_id: Uuid,
    decision: WithdrawalStatus,
) -> AppResult<ApiResponse<models::BalanceWithdrawal>> {
    ensure_admin(user)?;

    if decision == WithdrawalStatus::Pending {
        return Err(AppError::BadRequest(
            "Decision must be approved or rejected".into(),
        ));
    }

    let withdrawal = BalanceWithdrawals::find_by_id(withdrawal_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    if parse_withdrawal_status(&withdrawal.status)? != WithdrawalStatus::Pending {
        return Err(AppError::Conflict("Withdrawal already processed".into()));
    }

    // Claim the pending row; only one decision can ever win this.
    let claimed = sqlx::query(
        "UPDATE balance_withdrawals \
         SET status = $2, processed_at = now() \
         WHERE id = $1 AND status = 'pending'",
    )
    .bind(withdrawal.id)
    .bind(decision.as_str())
    .execute(&state.pool)
    .await?
    .rows_affected()
        == 1;

    if !claimed {
        return Err(AppError::Conflict("Withdrawal already processed".into()));
    }

    if decision == WithdrawalStatus::Approved {
        let debited = sqlx::query(
            "UPDATE seller_balances \
             SET current_balance = current_balance - $2, updated_at = now() \
             WHERE seller_id = $1 AND current_balance >= $2",
        )
        .bind(withdrawal.seller_id)
        .bind(withdrawal.amount)
        .execute(&state.pool)
        .await?
        .rows_affected()
            == 1;

        if !debited {
            // Balance moved since the claim; hand the row back to pending.
            sqlx::query(
                "UPDATE balance_withdrawals \
                 SET status = 'pending', processed_at = NULL \
                 WHERE id = $1",
            )
            .bind(withdrawal.id)
            .execute(&state.pool)
            .await?;
            return Err(AppError::InsufficientBalance);
        }
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "withdrawal_decided",
        Some("balance_withdrawals"),
        Some(serde_json::json!({
            "withdrawal_id": withdrawal.id,
            "decision": decision.as_str(),
        })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let updated = BalanceWithdrawals::find_by_id(withdrawal.id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(ApiResponse::success(
        "Withdrawal processed",
        models::BalanceWithdrawal::from_entity(updated)?,
        Some(Meta::empty()),
    ))
}
