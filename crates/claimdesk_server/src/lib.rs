//! claimdesk_server: axum REST surface over `claimdesk_core::AdminService`.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod side_effects;
