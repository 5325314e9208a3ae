//! Entitlement Gate — package limits, feature flags, and subscription
//! status.
//!
//! All checks recompute from persisted state on every call: counts are
//! live aggregates, never cached, so a decision is always consistent
//! with the state it read.

use chrono::Utc;
use clinica_core::error::{ClinicaError, ClinicaResult};
use clinica_core::models::consultorio::{Consultorio, SubscriptionStatus};
use clinica_core::models::package::{Feature, Package};
use clinica_core::models::staff::StaffKind;
use clinica_core::repository::{ConsultorioRepository, PackageRepository, StaffRepository};
use tracing::{error, warn};
use uuid::Uuid;

use crate::error::GuardError;

/// The dimension a numeric package limit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Doctor,
    Receptionist,
    Consultorio,
}

impl ResourceKind {
    pub fn name(self) -> &'static str {
        match self {
            ResourceKind::Doctor => "doctor",
            ResourceKind::Receptionist => "receptionist",
            ResourceKind::Consultorio => "consultorio",
        }
    }

    fn staff_kind(self) -> Option<StaffKind> {
        match self {
            ResourceKind::Doctor => Some(StaffKind::Doctor),
            ResourceKind::Receptionist => Some(StaffKind::Receptionist),
            ResourceKind::Consultorio => None,
        }
    }
}

/// Outcome of a limit check. Not an error: callers build user-facing
/// messages from the counts and decide whether to block.
#[derive(Debug, Clone)]
pub struct LimitDecision {
    pub permitted: bool,
    pub resource: ResourceKind,
    pub current: u64,
    /// `None` means the package places no limit on this resource.
    pub limit: Option<u64>,
    pub message: String,
}

/// Outcome of a feature check.
///
/// Tagged so callers can tell a typo in the feature key apart from a
/// flag the package genuinely disables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureDecision {
    Enabled,
    Disabled { feature: Feature, package: String },
    Unknown { feature: String },
}

impl FeatureDecision {
    pub fn permitted(&self) -> bool {
        matches!(self, FeatureDecision::Enabled)
    }
}

/// Decides whether a consultorio may perform a limited action or use a
/// gated feature under its current package and subscription.
pub struct EntitlementGate<C, S, P>
where
    C: ConsultorioRepository,
    S: StaffRepository,
    P: PackageRepository,
{
    consultorios: C,
    staff: S,
    packages: P,
}

impl<C, S, P> EntitlementGate<C, S, P>
where
    C: ConsultorioRepository,
    S: StaffRepository,
    P: PackageRepository,
{
    pub fn new(consultorios: C, staff: S, packages: P) -> Self {
        Self {
            consultorios,
            staff,
            packages,
        }
    }

    /// Resolve a consultorio and its package. A consultorio naming a
    /// package that does not exist is a configuration fault, not a
    /// normal-flow condition.
    async fn resolve(&self, consultorio_id: Uuid) -> ClinicaResult<(Consultorio, Package)> {
        let consultorio = self.consultorios.get_by_id(consultorio_id).await?;
        let package = self
            .packages
            .find_by_name(&consultorio.package_name)
            .await
            .inspect_err(|e| {
                if matches!(e, ClinicaError::NotFound { .. }) {
                    error!(
                        consultorio_id = %consultorio_id,
                        package_name = %consultorio.package_name,
                        "Consultorio references a package that does not exist"
                    );
                }
            })?;
        Ok((consultorio, package))
    }

    /// Decide whether one more resource of the given kind may be
    /// created under the consultorio's package.
    pub async fn check_limit(
        &self,
        consultorio_id: Uuid,
        kind: ResourceKind,
    ) -> ClinicaResult<LimitDecision> {
        let (_, package) = self.resolve(consultorio_id).await?;

        let Some(staff_kind) = kind.staff_kind() else {
            // Multi-clinic ownership accounting is not implemented yet;
            // the consultorio dimension always passes with a fixed
            // count of one.
            return Ok(LimitDecision {
                permitted: true,
                resource: kind,
                current: 1,
                limit: package.limits.consultorios.map(u64::from),
                message: "consultorio limit not enforced".into(),
            });
        };

        let current = self
            .staff
            .count_active_by_kind(consultorio_id, staff_kind)
            .await?;
        let limit = match kind {
            ResourceKind::Doctor => package.limits.doctors,
            ResourceKind::Receptionist => package.limits.receptionists,
            ResourceKind::Consultorio => unreachable!("handled above"),
        }
        .map(u64::from);

        let permitted = limit.is_none_or(|l| current < l);
        let message = match limit {
            None => format!("package {} places no {} limit", package.display_name, kind.name()),
            Some(l) if permitted => {
                format!("{current} of {l} {}s in use", kind.name())
            }
            Some(l) => format!(
                "package {} allows {l} {}s and {current} are in use",
                package.display_name,
                kind.name()
            ),
        };

        Ok(LimitDecision {
            permitted,
            resource: kind,
            current,
            limit,
            message,
        })
    }

    /// Decide whether a feature, named by wire key, is available under
    /// the consultorio's package.
    pub async fn check_feature(
        &self,
        consultorio_id: Uuid,
        feature_name: &str,
    ) -> ClinicaResult<FeatureDecision> {
        let (_, package) = self.resolve(consultorio_id).await?;

        let Some(feature) = Feature::parse(feature_name) else {
            warn!(feature = %feature_name, "Unknown feature flag requested");
            return Ok(FeatureDecision::Unknown {
                feature: feature_name.to_string(),
            });
        };

        if package.features.flag(feature) {
            Ok(FeatureDecision::Enabled)
        } else {
            Ok(FeatureDecision::Disabled {
                feature,
                package: package.display_name,
            })
        }
    }

    /// Block unless the consultorio's subscription currently permits
    /// gated actions. Trial is active-equivalent.
    ///
    /// An `Active` subscription whose stored expiry has passed is
    /// transitioned to `Expired` before the check denies — expiry is
    /// detected on demand rather than by a background sweep. The
    /// transition itself is a conditional update, so concurrent checks
    /// apply it at most once.
    pub async fn check_subscription_active(&self, consultorio_id: Uuid) -> ClinicaResult<()> {
        let consultorio = self.consultorios.get_by_id(consultorio_id).await?;
        let subscription = &consultorio.subscription;

        match subscription.status {
            SubscriptionStatus::Trial => Ok(()),
            SubscriptionStatus::Active => {
                if subscription.expires_at.is_some_and(|exp| exp <= Utc::now()) {
                    self.consultorios.expire_if_lapsed(consultorio_id).await?;
                    warn!(
                        consultorio_id = %consultorio_id,
                        "Subscription lapsed; recorded as Expired"
                    );
                    return Err(GuardError::SubscriptionLapsed {
                        status: SubscriptionStatus::Expired.as_str().into(),
                    }
                    .into());
                }
                Ok(())
            }
            status @ (SubscriptionStatus::Expired | SubscriptionStatus::Cancelled) => {
                Err(GuardError::SubscriptionLapsed {
                    status: status.as_str().into(),
                }
                .into())
            }
        }
    }
}
