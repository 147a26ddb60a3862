//! Router construction for the claimdesk admin server.

use std::sync::Arc;

use axum::{
    middleware as axum_mw,
    routing::{get, post},
    Extension, Router,
};
use tower_http::trace::TraceLayer;

use claimdesk_core::AdminService;

use crate::handlers;
use crate::middleware::jwt::{jwt_auth, JwtConfig};

/// Build the full axum router with all routes and middleware.
pub fn build_router(service: Arc<dyn AdminService>, jwt_config: JwtConfig) -> Router {
    // Routes that read the bearer session
    let protected = Router::new()
        // Claims
        .route("/admin/claims/bulk", post(handlers::claims::bulk))
        .route("/admin/claims/:id/approve", post(handlers::claims::approve))
        .route("/admin/claims/:id/reject", post(handlers::claims::reject))
        // Payments
        .route("/admin/payments/manual", post(handlers::payments::manual))
        .route(
            "/admin/payments/:identifier/verify",
            post(handlers::payments::verify),
        )
        .route(
            "/admin/payments/:identifier/reject",
            post(handlers::payments::reject),
        )
        .route("/payments", post(handlers::payments::submit))
        // Moderation
        .route(
            "/admin/reviews/bulk-update",
            post(handlers::reviews::bulk_update),
        )
        .route(
            "/admin/reviews/bulk-delete",
            post(handlers::reviews::bulk_delete),
        )
        .route(
            "/admin/businesses/bulk-update",
            post(handlers::businesses::bulk_update),
        )
        .route(
            "/admin/businesses/bulk-delete",
            post(handlers::businesses::bulk_delete),
        )
        .route("/admin/review-reports/bulk", post(handlers::reports::bulk))
        // Accounts
        .route("/admin/users/:id/premium", post(handlers::premium::toggle))
        .route("/admin/users/:id/role", post(handlers::users::change_role))
        .route(
            "/admin/users/:id/suspension",
            post(handlers::users::set_suspension),
        )
        .route("/admin/premium/expire", post(handlers::premium::expire))
        .layer(axum_mw::from_fn(jwt_auth))
        .layer(Extension(jwt_config));

    // Public routes (no auth)
    let public = Router::new().route("/health", get(handlers::health::health));

    // Combine and add shared state
    public
        .merge(protected)
        .layer(Extension(service))
        .layer(TraceLayer::new_for_http())
}
