//! Route definitions for the fabrication operations API

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes; everything under `/api/v1` requires a bearer token
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(inventory_routes())
        .nest("/sales-orders", sales_order_routes())
        .nest("/purchase-orders", purchase_order_routes())
        .nest("/purchasing", purchasing_routes())
        .nest("/cutting", cutting_routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

fn inventory_routes() -> Router<AppState> {
    Router::new()
        .route("/inventory-alerts", get(handlers::get_inventory_alerts))
        .route("/inventory/parts/:part_id/demand", get(handlers::get_part_demand))
}

fn sales_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(handlers::create_sales_order))
        .route("/:order_id", get(handlers::get_sales_order))
        .route("/:order_id/confirm", post(handlers::confirm_sales_order))
        .route("/:order_id/parts/bulk", post(handlers::bulk_update_parts))
        .route("/:order_id/parts/:part_id", patch(handlers::update_part_status))
}

fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route("/quick-create", post(handlers::quick_create))
        .route("/add-to-existing", post(handlers::add_to_existing))
        .route("/:po_id", get(handlers::get_purchase_order))
}

fn purchasing_routes() -> Router<AppState> {
    Router::new().route("/combined-summary", post(handlers::combined_summary))
}

fn cutting_routes() -> Router<AppState> {
    Router::new().route("/optimize", post(handlers::optimize_cuts))
}
