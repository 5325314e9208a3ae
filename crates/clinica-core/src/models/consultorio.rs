//! Consultorio (tenant) domain model.
//!
//! A consultorio is the unit of billing and data isolation. It names
//! its package by slug and carries a subscription sub-record whose
//! status drives all entitlement checks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SubscriptionStatus {
    Trial,
    Active,
    Expired,
    Cancelled,
}

impl SubscriptionStatus {
    /// Legal edges of the subscription state machine.
    ///
    /// `Cancelled` is terminal: nothing leaves it except starting a
    /// brand-new subscription record, which is not a transition of the
    /// existing one.
    pub fn can_transition_to(self, to: SubscriptionStatus) -> bool {
        use SubscriptionStatus::*;
        matches!(
            (self, to),
            (Trial, Active)
                | (Active, Expired)
                | (Expired, Active)
                | (Trial, Cancelled)
                | (Active, Cancelled)
        )
    }

    /// Whether this status permits gated actions. Trial is
    /// active-equivalent.
    pub fn permits_actions(self) -> bool {
        matches!(self, SubscriptionStatus::Trial | SubscriptionStatus::Active)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionStatus::Trial => "Trial",
            SubscriptionStatus::Active => "Active",
            SubscriptionStatus::Expired => "Expired",
            SubscriptionStatus::Cancelled => "Cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BillingCycle {
    Monthly,
    Yearly,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub status: SubscriptionStatus,
    pub started_at: DateTime<Utc>,
    /// `None` for subscriptions with no fixed end (e.g. comped tenants).
    pub expires_at: Option<DateTime<Utc>>,
    pub billing_cycle: BillingCycle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consultorio {
    pub id: Uuid,
    pub name: String,
    /// Slug of the package this consultorio is subscribed to.
    pub package_name: String,
    pub subscription: Subscription,
    /// Arbitrary key-value metadata.
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new consultorio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateConsultorio {
    pub name: String,
    pub package_name: String,
    pub subscription: Subscription,
    pub metadata: Option<serde_json::Value>,
}
