//! Staff domain model.
//!
//! Staff members belong to exactly one consultorio. Their kind is the
//! count dimension for entitlement checks, and doctors are the
//! collision key for scheduling.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StaffKind {
    Doctor,
    Receptionist,
    Admin,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum StaffStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Staff {
    pub id: Uuid,
    pub consultorio_id: Uuid,
    pub name: String,
    /// Unique within the consultorio.
    pub email: String,
    pub kind: StaffKind,
    pub status: StaffStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to create a new staff member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateStaff {
    pub consultorio_id: Uuid,
    pub name: String,
    pub email: String,
    pub kind: StaffKind,
}
