//! Integration tests for the Scheduler Guard against in-memory
//! SurrealDB.

use chrono::{TimeZone, Utc};
use clinica_core::error::ClinicaError;
use clinica_core::models::appointment::{AppointmentStatus, CreateAppointment};
use clinica_core::repository::AppointmentRepository;
use clinica_db::repository::SurrealAppointmentRepository;
use clinica_guard::{SchedulerGuard, SlotRequest};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

async fn setup() -> SurrealAppointmentRepository<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    clinica_db::run_migrations(&db).await.unwrap();
    SurrealAppointmentRepository::new(db)
}

fn booking(consultorio_id: Uuid, practitioner_id: Uuid, time: &str) -> CreateAppointment {
    CreateAppointment {
        consultorio_id,
        practitioner_id,
        patient_id: Uuid::new_v4(),
        day: Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap(),
        time: time.parse().unwrap(),
        reason: None,
        notes: None,
        status: AppointmentStatus::Confirmed,
    }
}

fn slot(practitioner_id: Uuid, time: &str) -> SlotRequest {
    SlotRequest {
        practitioner_id,
        day: Utc.with_ymd_and_hms(2024, 3, 15, 16, 45, 0).unwrap(),
        time: time.parse().unwrap(),
        exclude: None,
    }
}

#[tokio::test]
async fn occupied_slot_conflicts_regardless_of_clock_time() {
    let repo = setup().await;
    let practitioner_id = Uuid::new_v4();
    repo.create(booking(Uuid::new_v4(), practitioner_id, "09:00"))
        .await
        .unwrap();

    let guard = SchedulerGuard::new(repo);

    // The request timestamp carries a different wall-clock instant on
    // the same calendar day; only the day component matters.
    let err = guard
        .check_conflict(&slot(practitioner_id, "09:00"))
        .await
        .unwrap_err();
    assert!(
        matches!(err, ClinicaError::ScheduleConflict { .. }),
        "{err:?}"
    );
}

#[tokio::test]
async fn free_slot_passes() {
    let repo = setup().await;
    let practitioner_id = Uuid::new_v4();
    repo.create(booking(Uuid::new_v4(), practitioner_id, "09:00"))
        .await
        .unwrap();

    let guard = SchedulerGuard::new(repo);

    // Different time, same practitioner.
    guard
        .check_conflict(&slot(practitioner_id, "09:30"))
        .await
        .unwrap();

    // Same time, different practitioner.
    guard
        .check_conflict(&slot(Uuid::new_v4(), "09:00"))
        .await
        .unwrap();
}

#[tokio::test]
async fn cancelled_appointment_does_not_block() {
    let repo = setup().await;
    let consultorio_id = Uuid::new_v4();
    let practitioner_id = Uuid::new_v4();
    let appt = repo
        .create(booking(consultorio_id, practitioner_id, "09:00"))
        .await
        .unwrap();
    repo.cancel(consultorio_id, appt.id).await.unwrap();

    let guard = SchedulerGuard::new(repo);
    guard
        .check_conflict(&slot(practitioner_id, "09:00"))
        .await
        .unwrap();
}

#[tokio::test]
async fn excluded_appointment_does_not_conflict_with_itself() {
    let repo = setup().await;
    let practitioner_id = Uuid::new_v4();
    let appt = repo
        .create(booking(Uuid::new_v4(), practitioner_id, "09:00"))
        .await
        .unwrap();

    let guard = SchedulerGuard::new(repo);

    let mut request = slot(practitioner_id, "09:00");
    request.exclude = Some(appt.id);
    guard.check_conflict(&request).await.unwrap();

    // Excluding some other appointment still conflicts.
    request.exclude = Some(Uuid::new_v4());
    assert!(guard.check_conflict(&request).await.is_err());
}
