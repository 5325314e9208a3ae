//! Appointment domain model.
//!
//! An appointment occupies a slot: a (practitioner, calendar day,
//! "HH:MM" time) triple. At most one non-cancelled appointment may
//! occupy a slot at any given moment; cancelling releases the slot.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ClinicaError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

/// Time-of-day slot in "HH:MM" form.
///
/// Slots are compared by exact value. The system has no appointment
/// duration, so only identical start times collide; adjacent times
/// ("09:00" and "09:30") never conflict.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct SlotTime(String);

impl SlotTime {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for SlotTime {
    type Err = ClinicaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ClinicaError::Validation {
            message: format!("invalid slot time {s:?}, expected \"HH:MM\""),
        };

        let (hour, minute) = s.split_once(':').ok_or_else(invalid)?;
        if hour.len() != 2 || minute.len() != 2 {
            return Err(invalid());
        }
        let hour: u8 = hour.parse().map_err(|_| invalid())?;
        let minute: u8 = minute.parse().map_err(|_| invalid())?;
        if hour > 23 || minute > 59 {
            return Err(invalid());
        }

        Ok(SlotTime(s.to_string()))
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Truncate a timestamp to midnight UTC.
///
/// Two timestamps on the same calendar day denote the same scheduling
/// day regardless of their clock-time component.
pub fn normalize_day(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Exclusive upper bound of the calendar day containing `ts`.
pub fn next_day(ts: DateTime<Utc>) -> DateTime<Utc> {
    normalize_day(ts) + Days::new(1)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub consultorio_id: Uuid,
    pub practitioner_id: Uuid,
    pub patient_id: Uuid,
    /// Calendar day, normalized to midnight UTC.
    pub day: DateTime<Utc>,
    pub time: SlotTime,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub status: AppointmentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields required to book a new appointment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAppointment {
    pub consultorio_id: Uuid,
    pub practitioner_id: Uuid,
    pub patient_id: Uuid,
    pub day: DateTime<Utc>,
    pub time: SlotTime,
    pub reason: Option<String>,
    pub notes: Option<String>,
    /// Initial status; only `Pending` or `Confirmed` are accepted.
    pub status: AppointmentStatus,
}

/// Fields that can change on an existing appointment. `None` = no change.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RescheduleAppointment {
    pub practitioner_id: Option<Uuid>,
    pub day: Option<DateTime<Utc>>,
    pub time: Option<SlotTime>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

impl RescheduleAppointment {
    /// Whether this edit moves the appointment to a (possibly identical)
    /// slot and therefore must be conflict-checked. Edits touching only
    /// reason/notes never are.
    pub fn touches_slot(&self) -> bool {
        self.practitioner_id.is_some() || self.day.is_some() || self.time.is_some()
    }
}
