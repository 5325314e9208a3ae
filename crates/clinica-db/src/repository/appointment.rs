//! SurrealDB implementation of [`AppointmentRepository`].
//!
//! Slot exclusivity is enforced here as well as in the guard layer:
//! `create` and slot-touching `reschedule` re-run the conflict check
//! inside the same transaction as the write, so two concurrent
//! requests for one slot cannot both commit.

use chrono::{DateTime, Utc};
use clinica_core::error::{ClinicaError, ClinicaResult};
use clinica_core::models::appointment::{
    Appointment, AppointmentStatus, CreateAppointment, RescheduleAppointment, SlotTime,
    next_day, normalize_day,
};
use clinica_core::repository::{AppointmentRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

const SLOT_TAKEN: &str = "slot already booked";

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct AppointmentRow {
    consultorio_id: String,
    practitioner_id: String,
    patient_id: String,
    day: DateTime<Utc>,
    time: String,
    reason: Option<String>,
    notes: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct AppointmentRowWithId {
    record_id: String,
    consultorio_id: String,
    practitioner_id: String,
    patient_id: String,
    day: DateTime<Utc>,
    time: String,
    reason: Option<String>,
    notes: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_status(s: &str) -> Result<AppointmentStatus, DbError> {
    match s {
        "Pending" => Ok(AppointmentStatus::Pending),
        "Confirmed" => Ok(AppointmentStatus::Confirmed),
        "Completed" => Ok(AppointmentStatus::Completed),
        "Cancelled" => Ok(AppointmentStatus::Cancelled),
        other => Err(DbError::Decode(format!(
            "unknown appointment status: {other}"
        ))),
    }
}

fn status_to_string(s: AppointmentStatus) -> &'static str {
    match s {
        AppointmentStatus::Pending => "Pending",
        AppointmentStatus::Confirmed => "Confirmed",
        AppointmentStatus::Completed => "Completed",
        AppointmentStatus::Cancelled => "Cancelled",
    }
}

fn parse_slot(s: &str) -> Result<SlotTime, DbError> {
    s.parse()
        .map_err(|e: ClinicaError| DbError::Decode(e.to_string()))
}

impl AppointmentRow {
    fn into_appointment(self, id: Uuid) -> Result<Appointment, DbError> {
        let consultorio_id = Uuid::parse_str(&self.consultorio_id)
            .map_err(|e| DbError::Decode(format!("invalid consultorio UUID: {e}")))?;
        let practitioner_id = Uuid::parse_str(&self.practitioner_id)
            .map_err(|e| DbError::Decode(format!("invalid practitioner UUID: {e}")))?;
        let patient_id = Uuid::parse_str(&self.patient_id)
            .map_err(|e| DbError::Decode(format!("invalid patient UUID: {e}")))?;
        Ok(Appointment {
            id,
            consultorio_id,
            practitioner_id,
            patient_id,
            day: self.day,
            time: parse_slot(&self.time)?,
            reason: self.reason,
            notes: self.notes,
            status: parse_status(&self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl AppointmentRowWithId {
    fn try_into_appointment(self) -> Result<Appointment, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid UUID: {e}")))?;
        AppointmentRow {
            consultorio_id: self.consultorio_id,
            practitioner_id: self.practitioner_id,
            patient_id: self.patient_id,
            day: self.day,
            time: self.time,
            reason: self.reason,
            notes: self.notes,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_appointment(id)
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Appointment repository.
#[derive(Clone)]
pub struct SurrealAppointmentRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAppointmentRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> AppointmentRepository for SurrealAppointmentRepository<C> {
    async fn create(&self, input: CreateAppointment) -> ClinicaResult<Appointment> {
        match input.status {
            AppointmentStatus::Pending | AppointmentStatus::Confirmed => {}
            other => {
                return Err(ClinicaError::Validation {
                    message: format!("new appointments cannot start as {other:?}"),
                });
            }
        }

        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let day_start = normalize_day(input.day);
        let day_end = next_day(input.day);
        let practitioner_str = input.practitioner_id.to_string();
        let time_str = input.time.as_str().to_string();

        // The conflict re-check and the insert run in one transaction:
        // the guard's read-then-decide leaves a window where two
        // requests can both see a free slot, and the THROW closes it.
        let mut result = self
            .db
            .query(format!(
                "BEGIN TRANSACTION; \
                 LET $existing = (SELECT meta::id(id) AS record_id \
                     FROM appointment \
                     WHERE practitioner_id = $practitioner_id \
                     AND day >= $day_start AND day < $day_end \
                     AND time = $time AND status != 'Cancelled'); \
                 IF array::len($existing) > 0 {{ THROW '{SLOT_TAKEN}' }}; \
                 CREATE type::record('appointment', $id) SET \
                     consultorio_id = $consultorio_id, \
                     practitioner_id = $practitioner_id, \
                     patient_id = $patient_id, \
                     day = $day_start, time = $time, \
                     reason = $reason, notes = $notes, \
                     status = $status; \
                 COMMIT TRANSACTION;"
            ))
            .bind(("id", id_str.clone()))
            .bind(("consultorio_id", input.consultorio_id.to_string()))
            .bind(("practitioner_id", practitioner_str.clone()))
            .bind(("patient_id", input.patient_id.to_string()))
            .bind(("day_start", day_start))
            .bind(("day_end", day_end))
            .bind(("time", time_str.clone()))
            .bind(("reason", input.reason))
            .bind(("notes", input.notes))
            .bind(("status", status_to_string(input.status).to_string()))
            .await
            .map_err(DbError::from)?;

        // A THROW aborts the transaction, so every statement in it
        // reports an error; `check()` only surfaces the first one,
        // which is the generic "failed transaction" message. Scan all
        // statement errors for the thrown marker instead.
        let errors = result.take_errors();
        if !errors.is_empty() {
            if errors
                .values()
                .any(|e| e.to_string().contains(SLOT_TAKEN))
            {
                return Err(DbError::SlotTaken {
                    practitioner_id: practitioner_str,
                    day: day_start.format("%Y-%m-%d").to_string(),
                    time: time_str,
                }
                .into());
            }
            let (_, e) = errors
                .into_iter()
                .min_by_key(|(idx, _)| *idx)
                .expect("non-empty error map");
            return Err(DbError::Query(e.to_string()).into());
        }

        self.get_by_id(input.consultorio_id, id).await
    }

    async fn get_by_id(&self, consultorio_id: Uuid, id: Uuid) -> ClinicaResult<Appointment> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('appointment', $id) \
                 WHERE consultorio_id = $consultorio_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("consultorio_id", consultorio_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AppointmentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "appointment".into(),
            id: id_str,
        })?;

        Ok(row.into_appointment(id)?)
    }

    async fn find_conflicting(
        &self,
        practitioner_id: Uuid,
        day: DateTime<Utc>,
        time: &SlotTime,
        exclude_id: Option<Uuid>,
    ) -> ClinicaResult<Option<Appointment>> {
        let day_start = normalize_day(day);
        let day_end = next_day(day);

        let mut query = String::from(
            "SELECT meta::id(id) AS record_id, * FROM appointment \
             WHERE practitioner_id = $practitioner_id \
             AND day >= $day_start AND day < $day_end \
             AND time = $time AND status != 'Cancelled'",
        );
        if exclude_id.is_some() {
            query.push_str(" AND meta::id(id) != $exclude_id");
        }

        let mut builder = self
            .db
            .query(query)
            .bind(("practitioner_id", practitioner_id.to_string()))
            .bind(("day_start", day_start))
            .bind(("day_end", day_end))
            .bind(("time", time.as_str().to_string()));

        if let Some(exclude_id) = exclude_id {
            builder = builder.bind(("exclude_id", exclude_id.to_string()));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        let rows: Vec<AppointmentRowWithId> = result.take(0).map_err(DbError::from)?;

        match rows.into_iter().next() {
            Some(row) => Ok(Some(row.try_into_appointment()?)),
            None => Ok(None),
        }
    }

    async fn reschedule(
        &self,
        consultorio_id: Uuid,
        id: Uuid,
        input: RescheduleAppointment,
    ) -> ClinicaResult<Appointment> {
        let current = self.get_by_id(consultorio_id, id).await?;
        let id_str = id.to_string();

        if !input.touches_slot() {
            // Non-scheduling edit: plain update, no conflict check.
            let mut sets = Vec::new();
            if input.reason.is_some() {
                sets.push("reason = $reason");
            }
            if input.notes.is_some() {
                sets.push("notes = $notes");
            }
            sets.push("updated_at = time::now()");

            let query = format!(
                "UPDATE type::record('appointment', $id) SET {} \
                 WHERE consultorio_id = $consultorio_id",
                sets.join(", ")
            );

            let mut builder = self
                .db
                .query(&query)
                .bind(("id", id_str.clone()))
                .bind(("consultorio_id", consultorio_id.to_string()));
            if let Some(reason) = input.reason {
                builder = builder.bind(("reason", reason));
            }
            if let Some(notes) = input.notes {
                builder = builder.bind(("notes", notes));
            }

            let result = builder.await.map_err(DbError::from)?;
            result
                .check()
                .map_err(|e| DbError::Query(e.to_string()))?;

            return self.get_by_id(consultorio_id, id).await;
        }

        // Slot edit: the target slot (which may equal the current one)
        // is re-validated in the same transaction as the move, with the
        // appointment itself excluded.
        let practitioner_id = input.practitioner_id.unwrap_or(current.practitioner_id);
        let day_start = normalize_day(input.day.unwrap_or(current.day));
        let day_end = next_day(input.day.unwrap_or(current.day));
        let time = input.time.unwrap_or(current.time);

        let practitioner_str = practitioner_id.to_string();
        let time_str = time.as_str().to_string();

        let mut sets = vec![
            "practitioner_id = $practitioner_id",
            "day = $day_start",
            "time = $time",
        ];
        if input.reason.is_some() {
            sets.push("reason = $reason");
        }
        if input.notes.is_some() {
            sets.push("notes = $notes");
        }
        sets.push("updated_at = time::now()");

        let query = format!(
            "BEGIN TRANSACTION; \
             LET $existing = (SELECT meta::id(id) AS record_id \
                 FROM appointment \
                 WHERE practitioner_id = $practitioner_id \
                 AND day >= $day_start AND day < $day_end \
                 AND time = $time AND status != 'Cancelled' \
                 AND meta::id(id) != $id); \
             IF array::len($existing) > 0 {{ THROW '{SLOT_TAKEN}' }}; \
             UPDATE type::record('appointment', $id) SET {} \
                 WHERE consultorio_id = $consultorio_id; \
             COMMIT TRANSACTION;",
            sets.join(", ")
        );

        let mut builder = self
            .db
            .query(query)
            .bind(("id", id_str.clone()))
            .bind(("consultorio_id", consultorio_id.to_string()))
            .bind(("practitioner_id", practitioner_str.clone()))
            .bind(("day_start", day_start))
            .bind(("day_end", day_end))
            .bind(("time", time_str.clone()));
        if let Some(reason) = input.reason {
            builder = builder.bind(("reason", reason));
        }
        if let Some(notes) = input.notes {
            builder = builder.bind(("notes", notes));
        }

        let mut result = builder.await.map_err(DbError::from)?;
        // Same as in `create`: a THROW fails every statement in the
        // transaction, so scan all errors for the thrown marker.
        let errors = result.take_errors();
        if !errors.is_empty() {
            if errors
                .values()
                .any(|e| e.to_string().contains(SLOT_TAKEN))
            {
                return Err(DbError::SlotTaken {
                    practitioner_id: practitioner_str,
                    day: day_start.format("%Y-%m-%d").to_string(),
                    time: time_str,
                }
                .into());
            }
            let (_, e) = errors
                .into_iter()
                .min_by_key(|(idx, _)| *idx)
                .expect("non-empty error map");
            return Err(DbError::Query(e.to_string()).into());
        }

        self.get_by_id(consultorio_id, id).await
    }

    async fn set_status(
        &self,
        consultorio_id: Uuid,
        id: Uuid,
        status: AppointmentStatus,
    ) -> ClinicaResult<Appointment> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "UPDATE type::record('appointment', $id) SET \
                 status = $status, updated_at = time::now() \
                 WHERE consultorio_id = $consultorio_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("consultorio_id", consultorio_id.to_string()))
            .bind(("status", status_to_string(status).to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AppointmentRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "appointment".into(),
            id: id_str,
        })?;

        Ok(row.into_appointment(id)?)
    }

    async fn cancel(&self, consultorio_id: Uuid, id: Uuid) -> ClinicaResult<Appointment> {
        self.set_status(consultorio_id, id, AppointmentStatus::Cancelled)
            .await
    }

    async fn delete(&self, consultorio_id: Uuid, id: Uuid) -> ClinicaResult<()> {
        self.db
            .query(
                "DELETE type::record('appointment', $id) \
                 WHERE consultorio_id = $consultorio_id",
            )
            .bind(("id", id.to_string()))
            .bind(("consultorio_id", consultorio_id.to_string()))
            .await
            .map_err(DbError::from)?;

        Ok(())
    }

    async fn list(
        &self,
        consultorio_id: Uuid,
        pagination: Pagination,
    ) -> ClinicaResult<PaginatedResult<Appointment>> {
        let consultorio_str = consultorio_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM appointment \
                 WHERE consultorio_id = $consultorio_id GROUP ALL",
            )
            .bind(("consultorio_id", consultorio_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM appointment \
                 WHERE consultorio_id = $consultorio_id \
                 ORDER BY day ASC, time ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("consultorio_id", consultorio_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AppointmentRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_appointment())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
