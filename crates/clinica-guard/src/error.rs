//! Guard error types.

use clinica_core::error::ClinicaError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GuardError {
    #[error("slot {time} on {day} is already booked for this practitioner")]
    SlotTaken {
        practitioner_id: String,
        day: String,
        time: String,
    },

    #[error("subscription is {status}")]
    SubscriptionLapsed { status: String },

    #[error("{resource} limit reached ({current} of {limit})")]
    LimitReached {
        resource: String,
        current: u64,
        limit: u64,
    },

    #[error("feature {feature} is not included in package {package}")]
    FeatureDisabled { feature: String, package: String },

    #[error("unknown feature flag: {feature}")]
    UnknownFeature { feature: String },
}

impl From<GuardError> for ClinicaError {
    fn from(err: GuardError) -> Self {
        match err {
            GuardError::SlotTaken {
                practitioner_id,
                day,
                time,
            } => ClinicaError::ScheduleConflict {
                practitioner_id,
                day,
                time,
            },
            GuardError::SubscriptionLapsed { status } => {
                ClinicaError::SubscriptionExpired { status }
            }
            GuardError::LimitReached {
                resource,
                current,
                limit,
            } => ClinicaError::LimitExceeded {
                resource,
                current,
                limit,
            },
            GuardError::FeatureDisabled { feature, package } => {
                ClinicaError::FeatureNotPermitted { feature, package }
            }
            GuardError::UnknownFeature { feature } => ClinicaError::FeatureNotPermitted {
                feature,
                package: "unknown feature".into(),
            },
        }
    }
}
