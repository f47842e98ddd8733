use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod balance;
pub mod delivery;
pub mod doc;
pub mod health;
pub mod orders;
pub mod params;
pub mod products;
pub mod tracking;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/products", products::router())
        .nest("/orders", orders::router())
        .nest("/order-tracking", tracking::router())
        .nest("/order-to-deliver", delivery::router())
        .nest("/seller-balance", balance::router())
        .nest("/admin", admin::router())
}
