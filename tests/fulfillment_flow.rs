use marketplace_fulfillment_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::orders::{CheckoutItem, CheckoutRequest},
    entity::{products::ActiveModel as ProductActive, users::ActiveModel as UserActive},
    error::AppError,
    middleware::auth::AuthUser,
    services::{admin_service, balance_service, delivery_service, order_service, tracking_service},
    state::AppState,
    status::{ItemStatus, OrderStatus, PaymentStatus, WithdrawalStatus},
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

// Full lifecycle: checkout -> seller accept -> ship (tracking) -> rider ->
// proof -> complete -> settle -> withdraw.
#[tokio::test]
async fn order_lifecycle_through_settlement() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let buyer = create_user(&state, "buyer", "buyer@example.com", None).await?;
    let seller = create_user(
        &state,
        "seller",
        "seller@example.com",
        Some("14 Market Street"),
    )
    .await?;
    let rider = create_user(&state, "rider", "rider@example.com", None).await?;
    let admin = create_user(&state, "admin", "admin@example.com", None).await?;

    let basket = create_product(&state, seller.user_id, "Woven Basket", 100, 10).await?;
    let mangoes = create_product(&state, seller.user_id, "Dried Mangoes", 50, 5).await?;

    // Seller opens the ledger account up front.
    let balance = balance_service::create_balance(&state, &seller)
        .await?
        .data
        .unwrap();
    assert_eq!(balance.current_balance, 0);
    assert_eq!(balance.bank_number.len(), 8);

    // Checkout: 3 x 100 + 2 x 50 + 50 shipping = 450, one order (one seller).
    let checkout = order_service::checkout(
        &state,
        &buyer,
        CheckoutRequest {
            items: vec![
                CheckoutItem {
                    product_id: basket.id,
                    quantity: 3,
                },
                CheckoutItem {
                    product_id: mangoes.id,
                    quantity: 2,
                },
            ],
            delivery_address: "7 Harbor Road".into(),
            shipping_fee: 50,
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(checkout.orders.len(), 1);
    let order = &checkout.orders[0].order;
    assert_eq!(order.total_price, 450);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.seller_address, "14 Market Street");

    // Tracking is withheld while the order is still pending.
    let withheld = tracking_service::get_tracking_for_order(&state, &buyer, order.id).await;
    assert!(matches!(withheld, Err(AppError::NotFound)));

    // pending -> shipped skips confirmation and must fail.
    let premature =
        admin_service::update_order_status(&state, &admin, order.id, OrderStatus::Shipped).await;
    assert!(matches!(premature, Err(AppError::InvalidTransition { .. })));

    // Seller accepts: both items confirm, stock drops to (7, 3).
    let outcome = order_service::accept_pending_items(&state, &seller, order.id)
        .await?
        .data
        .unwrap();
    assert_eq!(outcome.order.status, OrderStatus::Confirmed);
    assert_eq!(outcome.confirmed.len(), 2);
    assert!(outcome.unfulfilled.is_empty());
    assert_eq!(product_stock(&state, basket.id).await?, 7);
    assert_eq!(product_stock(&state, mangoes.id).await?, 3);

    // Ship: tracking is created lazily with a fresh 8-char code.
    let shipped = admin_service::update_order_status(&state, &admin, order.id, OrderStatus::Shipped)
        .await?
        .data
        .unwrap();
    assert_eq!(shipped.status, OrderStatus::Shipped);

    let tracking = tracking_service::get_tracking_for_order(&state, &buyer, order.id)
        .await?
        .data
        .unwrap();
    assert_eq!(tracking.order_code.len(), 8);
    assert!(tracking.order_code.as_bytes()[..4]
        .iter()
        .all(|b| b.is_ascii_uppercase()));
    assert!(tracking.order_code.as_bytes()[4..]
        .iter()
        .all(|b| b.is_ascii_digit()));
    assert_eq!(tracking.payment_status, PaymentStatus::Pending);

    // Creating tracking again returns the same record.
    let (again, created) = tracking_service::ensure_tracking(&state, order.id).await?;
    assert!(!created);
    assert_eq!(again.order_code, tracking.order_code);

    // Rider assignment moves the order out for delivery.
    let delivery = delivery_service::assign_rider(&state, &admin, order.id, rider.user_id)
        .await?
        .data
        .unwrap();
    assert!(!delivery.is_delivered);

    let second_rider = delivery_service::assign_rider(&state, &admin, order.id, rider.user_id).await;
    assert!(matches!(second_rider, Err(AppError::InvalidTransition { .. })));

    // Proof capture is one-way.
    let delivered = delivery_service::capture_delivery_proof(
        &state,
        &rider,
        order.id,
        "uploads/proof-7781.jpg",
    )
    .await?
    .data
    .unwrap();
    assert!(delivered.is_delivered);
    assert_eq!(
        delivered.delivery_proof.as_deref(),
        Some("uploads/proof-7781.jpg")
    );

    let recapture =
        delivery_service::capture_delivery_proof(&state, &rider, order.id, "uploads/other.jpg")
            .await;
    assert!(matches!(recapture, Err(AppError::Conflict(_))));

    // Completion is the credit trigger.
    delivery_service::mark_completed(&state, &admin, delivery.id).await?;
    let completed = admin_service::get_order_admin(&state, &admin, order.id)
        .await?
        .data
        .unwrap();
    assert_eq!(completed.order.status, OrderStatus::Completed);
    assert!(completed
        .items
        .iter()
        .all(|i| i.status == ItemStatus::Completed));

    // Settle: 450 - 50 flat fee = 400 credited, tracking Paid.
    let settlement = balance_service::credit_on_delivery(&state, &admin, &tracking.order_code)
        .await?
        .data
        .unwrap();
    assert_eq!(settlement.amount_credited, 400);
    assert!(settlement.payment_status_updated);
    assert_eq!(settlement.balance.current_balance, 400);

    // Settling twice never double-credits.
    let resettle = balance_service::credit_on_delivery(&state, &admin, &tracking.order_code).await;
    assert!(matches!(resettle, Err(AppError::Conflict(_))));
    let balance = balance_service::get_balance(&state, &seller)
        .await?
        .data
        .unwrap();
    assert_eq!(balance.current_balance, 400);

    // Withdraw 150, approved against the balance.
    let withdrawal = balance_service::request_withdrawal(&state, &seller, 150)
        .await?
        .data
        .unwrap();
    assert_eq!(withdrawal.status, WithdrawalStatus::Pending);

    let decided = balance_service::decide_withdrawal(
        &state,
        &admin,
        withdrawal.id,
        WithdrawalStatus::Approved,
    )
    .await?
    .data
    .unwrap();
    assert_eq!(decided.status, WithdrawalStatus::Approved);

    let balance = balance_service::get_balance(&state, &seller)
        .await?
        .data
        .unwrap();
    assert_eq!(balance.current_balance, 250);

    // The request-time guard rejects amounts above the remaining balance.
    let too_much = balance_service::request_withdrawal(&state, &seller, 300).await;
    assert!(matches!(too_much, Err(AppError::InsufficientBalance)));

    Ok(())
}

// Stock contention after checkout: the accept confirms nothing, the order
// stays pending and the outcome reports what was actually left.
#[tokio::test]
async fn accept_with_insufficient_stock_reports_shortfall() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let buyer = create_user(&state, "buyer", "buyer2@example.com", None).await?;
    let seller = create_user(&state, "seller", "seller2@example.com", Some("Pier 3")).await?;

    let product = create_product(&state, seller.user_id, "Coconut Vinegar", 95, 3).await?;

    let checkout = order_service::checkout(
        &state,
        &buyer,
        CheckoutRequest {
            items: vec![CheckoutItem {
                product_id: product.id,
                quantity: 3,
            }],
            delivery_address: "7 Harbor Road".into(),
            shipping_fee: 0,
        },
    )
    .await?
    .data
    .unwrap();
    let order = &checkout.orders[0].order;

    // Another sale drains the pool down to 1 before the seller accepts.
    sqlx::query("UPDATE products SET stock = 1 WHERE id = $1")
        .bind(product.id)
        .execute(&state.pool)
        .await?;

    let failed = order_service::accept_pending_items(&state, &seller, order.id).await;
    match failed {
        Err(AppError::InsufficientStock(unfulfilled)) => {
            assert_eq!(unfulfilled.len(), 1);
            assert_eq!(unfulfilled[0].product_id, product.id);
            assert_eq!(unfulfilled[0].requested, 3);
            assert_eq!(unfulfilled[0].available, 1);
        }
        other => panic!("expected InsufficientStock, got {other:?}"),
    }

    // Order and stock are untouched.
    let after = order_service::get_order(&state, &buyer, order.id)
        .await?
        .data
        .unwrap();
    assert_eq!(after.order.status, OrderStatus::Pending);
    assert!(after.items.iter().all(|i| i.status == ItemStatus::Pending));
    assert_eq!(product_stock(&state, product.id).await?, 1);

    Ok(())
}

// Partial acceptance: confirm what the pool covers, report the rest.
#[tokio::test]
async fn accept_confirms_partially_under_contention() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };

    let buyer = create_user(&state, "buyer", "buyer3@example.com", None).await?;
    let seller = create_user(&state, "seller", "seller3@example.com", Some("Pier 3")).await?;

    let plenty = create_product(&state, seller.user_id, "Banana Chips", 60, 50).await?;
    let scarce = create_product(&state, seller.user_id, "Rattan Chair", 900, 2).await?;

    let checkout = order_service::checkout(
        &state,
        &buyer,
        CheckoutRequest {
            items: vec![
                CheckoutItem {
                    product_id: plenty.id,
                    quantity: 4,
                },
                CheckoutItem {
                    product_id: scarce.id,
                    quantity: 2,
                },
            ],
            delivery_address: "7 Harbor Road".into(),
            shipping_fee: 20,
        },
    )
    .await?
    .data
    .unwrap();
    let order = &checkout.orders[0].order;

    sqlx::query("UPDATE products SET stock = 1 WHERE id = $1")
        .bind(scarce.id)
        .execute(&state.pool)
        .await?;

    let outcome = order_service::accept_pending_items(&state, &seller, order.id)
        .await?
        .data
        .unwrap();
    assert_eq!(outcome.order.status, OrderStatus::Confirmed);
    assert_eq!(outcome.confirmed.len(), 1);
    assert_eq!(outcome.confirmed[0].product_id, plenty.id);
    assert_eq!(outcome.unfulfilled.len(), 1);
    assert_eq!(outcome.unfulfilled[0].product_id, scarce.id);
    assert_eq!(outcome.unfulfilled[0].available, 1);

    // Cancelling releases the reserved stock and closes the order.
    let cancelled = order_service::cancel_items(&state, &seller, order.id)
        .await?
        .data
        .unwrap();
    assert_eq!(cancelled.order.status, OrderStatus::Cancelled);
    assert_eq!(product_stock(&state, plenty.id).await?, 50);

    Ok(())
}

async fn setup_state() -> anyhow::Result<Option<AppState>> {
    // Allow skipping when no DB is configured in the environment.
    let database_url =
        match std::env::var("TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL")) {
            Ok(url) => url,
            Err(_) => {
                eprintln!(
                    "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
                );
                return Ok(None);
            }
        };

    let pool = create_pool(&database_url).await?;
    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&pool).await?;

    // Clean tables between runs
    sqlx::query(
        "TRUNCATE TABLE balance_withdrawals, seller_balances, order_deliveries, order_tracking, \
         order_items, orders, audit_logs, products, users RESTART IDENTITY CASCADE",
    )
    .execute(&pool)
    .await?;

    Ok(Some(AppState { pool, orm }))
}

async fn create_user(
    state: &AppState,
    role: &str,
    email: &str,
    address: Option<&str>,
) -> anyhow::Result<AuthUser> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        role: Set(role.into()),
        address: Set(address.map(str::to_string)),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        role: role.into(),
    })
}

async fn create_product(
    state: &AppState,
    seller_id: Uuid,
    name: &str,
    price: i64,
    stock: i32,
) -> anyhow::Result<marketplace_fulfillment_api::models::Product> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        seller_id: Set(seller_id),
        name: Set(name.into()),
        description: Set(Some(format!("{name} for testing"))),
        price: Set(price),
        stock: Set(stock),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(marketplace_fulfillment_api::models::Product::from_entity(
        product,
    ))
}

async fn product_stock(state: &AppState, product_id: Uuid) -> anyhow::Result<i32> {
    let (stock,): (i32,) = sqlx::query_as("SELECT stock FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_one(&state.pool)
        .await?;
    Ok(stock)
}
