//! CLINICA Guard — slot conflict detection, subscription entitlement
//! gating, and the service layer composing both in front of mutations.
//!
//! Generic over the `clinica-core` repository traits so that the guard
//! layer has no dependency on the database crate. Guards are pure
//! decision functions over persisted state: stateless, no retries, no
//! memory between calls.

pub mod entitlement;
pub mod error;
pub mod scheduler;
pub mod service;

pub use entitlement::{EntitlementGate, FeatureDecision, LimitDecision, ResourceKind};
pub use error::GuardError;
pub use scheduler::{SchedulerGuard, SlotRequest};
pub use service::ClinicService;
