//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Consultorio-scoped
//! repositories require a `consultorio_id` parameter to enforce data
//! isolation.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::ClinicaResult;
use crate::models::{
    appointment::{
        Appointment, AppointmentStatus, CreateAppointment, RescheduleAppointment, SlotTime,
    },
    consultorio::{Consultorio, CreateConsultorio, Subscription},
    package::{CreatePackage, Package, PackageFeatures},
    staff::{CreateStaff, Staff, StaffKind},
};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Consultorio & Package (global scope)
// ---------------------------------------------------------------------------

pub trait ConsultorioRepository: Send + Sync {
    fn create(
        &self,
        input: CreateConsultorio,
    ) -> impl Future<Output = ClinicaResult<Consultorio>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = ClinicaResult<Consultorio>> + Send;

    /// Transition `Active` -> `Expired` if the stored expiry has
    /// passed. Conditional on the stored status, so it is idempotent
    /// and safe under concurrent calls. Returns whether a transition
    /// was applied.
    fn expire_if_lapsed(&self, id: Uuid) -> impl Future<Output = ClinicaResult<bool>> + Send;

    /// Renew the subscription: sets status `Active` with a new expiry.
    /// Illegal from `Cancelled`.
    fn renew(
        &self,
        id: Uuid,
        expires_at: DateTime<Utc>,
    ) -> impl Future<Output = ClinicaResult<Consultorio>> + Send;

    /// Explicit cancellation. Legal only from `Trial` or `Active`.
    fn cancel_subscription(
        &self,
        id: Uuid,
    ) -> impl Future<Output = ClinicaResult<Consultorio>> + Send;

    /// Replace the subscription record with a brand-new cycle. The
    /// only way forward once a subscription is `Cancelled`.
    fn start_subscription(
        &self,
        id: Uuid,
        subscription: Subscription,
    ) -> impl Future<Output = ClinicaResult<Consultorio>> + Send;

    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = ClinicaResult<PaginatedResult<Consultorio>>> + Send;
}

pub trait PackageRepository: Send + Sync {
    fn create(&self, input: CreatePackage) -> impl Future<Output = ClinicaResult<Package>> + Send;

    /// Resolve a package by its slug. A dangling reference from a
    /// consultorio is a configuration error surfaced as `NotFound`.
    fn find_by_name(&self, name: &str) -> impl Future<Output = ClinicaResult<Package>> + Send;

    fn update_features(
        &self,
        name: &str,
        features: PackageFeatures,
    ) -> impl Future<Output = ClinicaResult<Package>> + Send;

    fn list(
        &self,
        pagination: Pagination,
    ) -> impl Future<Output = ClinicaResult<PaginatedResult<Package>>> + Send;
}

// ---------------------------------------------------------------------------
// Consultorio-scoped repositories
// ---------------------------------------------------------------------------

pub trait StaffRepository: Send + Sync {
    fn create(&self, input: CreateStaff) -> impl Future<Output = ClinicaResult<Staff>> + Send;
    fn get_by_id(
        &self,
        consultorio_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = ClinicaResult<Staff>> + Send;

    /// Live count of `Active` staff of the given kind. Always an
    /// aggregate query, never a cached counter, so the entitlement
    /// check reflects current state.
    fn count_active_by_kind(
        &self,
        consultorio_id: Uuid,
        kind: StaffKind,
    ) -> impl Future<Output = ClinicaResult<u64>> + Send;

    /// Soft-delete: sets status to Inactive, freeing a limit slot.
    fn deactivate(
        &self,
        consultorio_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = ClinicaResult<()>> + Send;

    fn list(
        &self,
        consultorio_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = ClinicaResult<PaginatedResult<Staff>>> + Send;
}

pub trait AppointmentRepository: Send + Sync {
    /// Book a new appointment. The conflict check is re-run atomically
    /// with the insert at the storage layer, so concurrent bookings of
    /// the same slot cannot both commit.
    fn create(
        &self,
        input: CreateAppointment,
    ) -> impl Future<Output = ClinicaResult<Appointment>> + Send;

    fn get_by_id(
        &self,
        consultorio_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = ClinicaResult<Appointment>> + Send;

    /// Find a non-cancelled appointment occupying the slot
    /// (practitioner, calendar day of `day`, exact `time`), ignoring
    /// `exclude_id` so a reschedule does not collide with itself.
    fn find_conflicting(
        &self,
        practitioner_id: Uuid,
        day: DateTime<Utc>,
        time: &SlotTime,
        exclude_id: Option<Uuid>,
    ) -> impl Future<Output = ClinicaResult<Option<Appointment>>> + Send;

    /// Move and/or edit an appointment. Slot changes are re-validated
    /// atomically with the write, excluding the appointment itself.
    fn reschedule(
        &self,
        consultorio_id: Uuid,
        id: Uuid,
        input: RescheduleAppointment,
    ) -> impl Future<Output = ClinicaResult<Appointment>> + Send;

    fn set_status(
        &self,
        consultorio_id: Uuid,
        id: Uuid,
        status: AppointmentStatus,
    ) -> impl Future<Output = ClinicaResult<Appointment>> + Send;

    /// Cancellation releases the slot for new bookings.
    fn cancel(
        &self,
        consultorio_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = ClinicaResult<Appointment>> + Send;

    /// Administrative hard delete.
    fn delete(
        &self,
        consultorio_id: Uuid,
        id: Uuid,
    ) -> impl Future<Output = ClinicaResult<()>> + Send;

    fn list(
        &self,
        consultorio_id: Uuid,
        pagination: Pagination,
    ) -> impl Future<Output = ClinicaResult<PaginatedResult<Appointment>>> + Send;
}
