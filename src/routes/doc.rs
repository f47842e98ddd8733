use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        balance::{ReconcileReport, SettlementOutcome, SettlementRequest, WithdrawRequest,
            WithdrawalDecisionRequest, WithdrawalList},
        delivery::{AssignRiderRequest, DeliveryList, DeliveryProofRequest},
        orders::{AcceptItemsOutcome, CancelItemsOutcome, CheckoutItem, CheckoutRequest,
            CheckoutResponse, OrderList, OrderWithItems, UnfulfilledItem},
        products::{CreateProductRequest, ProductList},
        tracking::CreateTrackingRequest,
    },
    models::{BalanceWithdrawal, Order, OrderDelivery, OrderItem, OrderTracking, Product,
        SellerBalance, User},
    response::{ApiResponse, Meta},
    routes::{admin, auth, balance, delivery, health, orders, params, products, tracking},
    status::{ItemStatus, OrderStatus, PaymentStatus, WithdrawalStatus},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::login,
        auth::register,
        products::list_products,
        products::create_product,
        products::get_product,
        orders::list_orders,
        orders::checkout,
        orders::list_seller_orders,
        orders::accept_items,
        orders::cancel_items,
        orders::get_order,
        tracking::create_tracking,
        tracking::get_tracking,
        delivery::assign_rider,
        delivery::capture_proof,
        delivery::mark_completed,
        delivery::list_my_deliveries,
        balance::create_balance,
        balance::get_balance,
        balance::request_withdrawal,
        balance::list_withdrawals,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::mark_tracking_paid,
        admin::credit_seller_balance,
        admin::decide_withdrawal,
        admin::reconcile_settlements
    ),
    components(
        schemas(
            User,
            Product,
            Order,
            OrderItem,
            OrderTracking,
            OrderDelivery,
            SellerBalance,
            BalanceWithdrawal,
            OrderStatus,
            ItemStatus,
            PaymentStatus,
            WithdrawalStatus,
            CheckoutItem,
            CheckoutRequest,
            CheckoutResponse,
            OrderWithItems,
            OrderList,
            AcceptItemsOutcome,
            CancelItemsOutcome,
            UnfulfilledItem,
            CreateTrackingRequest,
            AssignRiderRequest,
            DeliveryProofRequest,
            DeliveryList,
            WithdrawRequest,
            WithdrawalDecisionRequest,
            WithdrawalList,
            SettlementRequest,
            SettlementOutcome,
            ReconcileReport,
            CreateProductRequest,
            ProductList,
            admin::UpdateOrderStatusRequest,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<AcceptItemsOutcome>,
            ApiResponse<CancelItemsOutcome>,
            ApiResponse<OrderTracking>,
            ApiResponse<OrderDelivery>,
            ApiResponse<SellerBalance>,
            ApiResponse<BalanceWithdrawal>,
            ApiResponse<SettlementOutcome>,
            ApiResponse<ReconcileReport>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Products", description = "Product catalog endpoints"),
        (name = "Orders", description = "Order placement and seller fulfillment"),
        (name = "Tracking", description = "Order tracking codes and payment status"),
        (name = "Delivery", description = "Courier assignment and proof of delivery"),
        (name = "Balance", description = "Seller balance and withdrawals"),
        (name = "Admin", description = "Operator endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
