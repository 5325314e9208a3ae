//! Error types for the CLINICA system.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClinicaError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Slot already booked: practitioner {practitioner_id} on {day} at {time}")]
    ScheduleConflict {
        practitioner_id: String,
        day: String,
        time: String,
    },

    #[error("Subscription is not active: {status}")]
    SubscriptionExpired { status: String },

    #[error("Limit reached for {resource}: {current} of {limit}")]
    LimitExceeded {
        resource: String,
        current: u64,
        limit: u64,
    },

    #[error("Feature not permitted: {feature} (package {package})")]
    FeatureNotPermitted { feature: String, package: String },

    #[error("Invalid subscription transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ClinicaResult<T> = Result<T, ClinicaError>;
