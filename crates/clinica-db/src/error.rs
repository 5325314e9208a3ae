//! Database-specific error types and conversions.

use clinica_core::error::ClinicaError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Corrupt record: {0}")]
    Decode(String),

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Slot {time} on {day} is already booked for practitioner {practitioner_id}")]
    SlotTaken {
        practitioner_id: String,
        day: String,
        time: String,
    },

    #[error("Illegal subscription transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
}

impl From<DbError> for ClinicaError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ClinicaError::NotFound { entity, id },
            DbError::SlotTaken {
                practitioner_id,
                day,
                time,
            } => ClinicaError::ScheduleConflict {
                practitioner_id,
                day,
                time,
            },
            DbError::InvalidTransition { from, to } => ClinicaError::InvalidTransition { from, to },
            other => ClinicaError::Database(other.to_string()),
        }
    }
}
