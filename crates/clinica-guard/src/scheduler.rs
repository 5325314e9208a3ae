//! Scheduler Guard — slot collision checking.
//!
//! A slot is the (practitioner, calendar day, "HH:MM" time) triple.
//! The guard decides whether a candidate booking may occupy a slot
//! without colliding with an existing non-cancelled appointment for
//! the same practitioner. It is read-only; the caller decides what to
//! do with a conflict.

use chrono::{DateTime, Utc};
use clinica_core::error::ClinicaResult;
use clinica_core::models::appointment::{SlotTime, normalize_day};
use clinica_core::repository::AppointmentRepository;
use tracing::debug;
use uuid::Uuid;

use crate::error::GuardError;

/// A candidate slot to validate.
#[derive(Debug, Clone)]
pub struct SlotRequest {
    pub practitioner_id: Uuid,
    /// Any timestamp on the target day; normalized before comparison.
    pub day: DateTime<Utc>,
    pub time: SlotTime,
    /// During a reschedule, the appointment being edited, so it does
    /// not conflict with itself.
    pub exclude: Option<Uuid>,
}

/// Decides whether a booking or reschedule may occupy a slot.
pub struct SchedulerGuard<A: AppointmentRepository> {
    appointments: A,
}

impl<A: AppointmentRepository> SchedulerGuard<A> {
    pub fn new(appointments: A) -> Self {
        Self { appointments }
    }

    /// Check the candidate slot against existing appointments.
    ///
    /// Cancelled appointments never block: the slot is free once its
    /// occupant is cancelled. Times are compared by exact value — the
    /// system has no duration concept, so only identical start times
    /// collide.
    pub async fn check_conflict(&self, request: &SlotRequest) -> ClinicaResult<()> {
        let day = normalize_day(request.day);

        if let Some(existing) = self
            .appointments
            .find_conflicting(request.practitioner_id, day, &request.time, request.exclude)
            .await?
        {
            debug!(
                practitioner_id = %request.practitioner_id,
                day = %existing.day.format("%Y-%m-%d"),
                time = %existing.time,
                "Slot conflict detected"
            );
            return Err(GuardError::SlotTaken {
                practitioner_id: request.practitioner_id.to_string(),
                day: existing.day.format("%Y-%m-%d").to_string(),
                time: existing.time.to_string(),
            }
            .into());
        }

        Ok(())
    }
}
