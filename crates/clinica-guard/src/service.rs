//! Service layer composing the guards in front of mutations.
//!
//! Every mutating operation runs the subscription gate first, then any
//! operation-specific guard, then the write. The storage layer re-runs
//! the conflict check atomically with the write, so the guard here is
//! the fast path and the storage check is the authoritative one.

use clinica_core::error::ClinicaResult;
use clinica_core::models::appointment::{Appointment, CreateAppointment, RescheduleAppointment};
use clinica_core::models::staff::{CreateStaff, Staff, StaffKind};
use clinica_core::repository::{
    AppointmentRepository, ConsultorioRepository, PackageRepository, StaffRepository,
};
use tracing::info;
use uuid::Uuid;

use crate::entitlement::{EntitlementGate, FeatureDecision, ResourceKind};
use crate::error::GuardError;
use crate::scheduler::{SchedulerGuard, SlotRequest};

/// Facade over booking, rescheduling, and staff management with all
/// guards applied.
pub struct ClinicService<A, C, S, P>
where
    A: AppointmentRepository,
    C: ConsultorioRepository,
    S: StaffRepository,
    P: PackageRepository,
{
    appointments: A,
    staff: S,
    scheduler: SchedulerGuard<A>,
    entitlements: EntitlementGate<C, S, P>,
}

impl<A, C, S, P> ClinicService<A, C, S, P>
where
    A: AppointmentRepository + Clone,
    C: ConsultorioRepository,
    S: StaffRepository + Clone,
    P: PackageRepository,
{
    pub fn new(appointments: A, consultorios: C, staff: S, packages: P) -> Self {
        Self {
            scheduler: SchedulerGuard::new(appointments.clone()),
            entitlements: EntitlementGate::new(consultorios, staff.clone(), packages),
            appointments,
            staff,
        }
    }

    /// Book an appointment: subscription gate, slot conflict check,
    /// then insert.
    pub async fn book_appointment(&self, input: CreateAppointment) -> ClinicaResult<Appointment> {
        self.entitlements
            .check_subscription_active(input.consultorio_id)
            .await?;

        self.scheduler
            .check_conflict(&SlotRequest {
                practitioner_id: input.practitioner_id,
                day: input.day,
                time: input.time.clone(),
                exclude: None,
            })
            .await?;

        let appointment = self.appointments.create(input).await?;
        info!(
            appointment_id = %appointment.id,
            consultorio_id = %appointment.consultorio_id,
            "Appointment booked"
        );
        Ok(appointment)
    }

    /// Edit an appointment. The conflict check only runs when the edit
    /// moves the slot; note-only edits go straight through. The
    /// appointment itself is excluded so moving within the same slot
    /// is a no-op rather than a self-conflict.
    pub async fn reschedule_appointment(
        &self,
        consultorio_id: Uuid,
        id: Uuid,
        input: RescheduleAppointment,
    ) -> ClinicaResult<Appointment> {
        self.entitlements
            .check_subscription_active(consultorio_id)
            .await?;

        if input.touches_slot() {
            let current = self.appointments.get_by_id(consultorio_id, id).await?;
            self.scheduler
                .check_conflict(&SlotRequest {
                    practitioner_id: input.practitioner_id.unwrap_or(current.practitioner_id),
                    day: input.day.unwrap_or(current.day),
                    time: input.time.clone().unwrap_or(current.time),
                    exclude: Some(id),
                })
                .await?;
        }

        self.appointments.reschedule(consultorio_id, id, input).await
    }

    /// Cancel an appointment, releasing its slot. Allowed even when the
    /// subscription has lapsed: tenants can always wind down existing
    /// bookings.
    pub async fn cancel_appointment(
        &self,
        consultorio_id: Uuid,
        id: Uuid,
    ) -> ClinicaResult<Appointment> {
        let appointment = self.appointments.cancel(consultorio_id, id).await?;
        info!(appointment_id = %id, "Appointment cancelled");
        Ok(appointment)
    }

    /// Hire staff: subscription gate, then the package limit for the
    /// relevant kind. Admins are not limited by any package.
    pub async fn add_staff(&self, input: CreateStaff) -> ClinicaResult<Staff> {
        self.entitlements
            .check_subscription_active(input.consultorio_id)
            .await?;

        let resource = match input.kind {
            StaffKind::Doctor => Some(ResourceKind::Doctor),
            StaffKind::Receptionist => Some(ResourceKind::Receptionist),
            StaffKind::Admin => None,
        };

        if let Some(resource) = resource {
            let decision = self
                .entitlements
                .check_limit(input.consultorio_id, resource)
                .await?;
            if !decision.permitted {
                return Err(GuardError::LimitReached {
                    resource: resource.name().into(),
                    current: decision.current,
                    limit: decision.limit.unwrap_or(0),
                }
                .into());
            }
        }

        self.staff.create(input).await
    }

    /// Require a feature flag, turning the tagged decision into an
    /// error for callers that just want to gate an endpoint.
    pub async fn require_feature(
        &self,
        consultorio_id: Uuid,
        feature_name: &str,
    ) -> ClinicaResult<()> {
        match self
            .entitlements
            .check_feature(consultorio_id, feature_name)
            .await?
        {
            FeatureDecision::Enabled => Ok(()),
            FeatureDecision::Disabled { feature, package } => Err(GuardError::FeatureDisabled {
                feature: feature.name().into(),
                package,
            }
            .into()),
            FeatureDecision::Unknown { feature } => {
                Err(GuardError::UnknownFeature { feature }.into())
            }
        }
    }

    pub fn entitlements(&self) -> &EntitlementGate<C, S, P> {
        &self.entitlements
    }

    pub fn scheduler(&self) -> &SchedulerGuard<A> {
        &self.scheduler
    }
}
