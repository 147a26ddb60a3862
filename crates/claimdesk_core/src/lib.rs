//! claimdesk_core: claim review, payment verification and entitlement
//! reconciliation for a business directory's admin back office.
//!
//! The engines depend only on the port traits in [`ports`]; the Postgres
//! adapter and the in-memory backend in [`memory`] implement them.
//!
//! ```text
//! Session ──► AuthorizationGate ──► AdminContext
//!                                      │
//!        ┌──────────────┬──────────────┼────────────────┬─────────────────┐
//!        ▼              ▼              ▼                ▼                 ▼
//!  ClaimTransition  PaymentVerif.  BulkOperation   AccountAdmin.     SideEffects
//!        │              │           Runner              │
//!        └──── SchemaDriftGuard ────┴── EntitlementSync ┘
//! ```

// String-backed enums expose `from_str() -> Option<Self>`; unknown values
// are `None`, not an error.
#![allow(clippy::should_implement_trait)]

pub mod accounts;
pub mod audit;
pub mod bulk;
pub mod claims;
pub mod config;
pub mod entitlement;
pub mod error;
pub mod gate;
pub mod memory;
pub mod payments;
pub mod ports;
pub mod rbac;
pub mod schema_drift;
pub mod service;
pub mod side_effects;
pub mod types;
pub mod writes;

pub use config::{ClaimWriteMode, EngineConfig, TierLimits};
pub use error::{AdminError, SideEffectError, StoreError, StoreErrorKind};
pub use gate::{AdminContext, Session};
pub use memory::{FaultPlan, MemoryStore};
pub use ports::Ports;
pub use service::{AdminService, AdminServiceImpl};
pub use types::{ActionOutcome, BulkOperationResult, OutcomeStatus};
