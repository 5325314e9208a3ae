//! SurrealDB implementation of [`ConsultorioRepository`].
//!
//! Subscription transitions are validated against the state machine in
//! `clinica-core` before any write. The lazy-expiry transition is a
//! single conditional UPDATE so concurrent checks cannot double-apply
//! it.

use chrono::{DateTime, Utc};
use clinica_core::error::ClinicaResult;
use clinica_core::models::consultorio::{
    BillingCycle, Consultorio, CreateConsultorio, Subscription, SubscriptionStatus,
};
use clinica_core::repository::{ConsultorioRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, Clone, SurrealValue)]
struct SubscriptionRow {
    status: String,
    started_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    billing_cycle: String,
}

fn parse_status(s: &str) -> Result<SubscriptionStatus, DbError> {
    match s {
        "Trial" => Ok(SubscriptionStatus::Trial),
        "Active" => Ok(SubscriptionStatus::Active),
        "Expired" => Ok(SubscriptionStatus::Expired),
        "Cancelled" => Ok(SubscriptionStatus::Cancelled),
        other => Err(DbError::Decode(format!(
            "unknown subscription status: {other}"
        ))),
    }
}

fn parse_cycle(s: &str) -> Result<BillingCycle, DbError> {
    match s {
        "Monthly" => Ok(BillingCycle::Monthly),
        "Yearly" => Ok(BillingCycle::Yearly),
        other => Err(DbError::Decode(format!("unknown billing cycle: {other}"))),
    }
}

fn cycle_to_string(c: BillingCycle) -> &'static str {
    match c {
        BillingCycle::Monthly => "Monthly",
        BillingCycle::Yearly => "Yearly",
    }
}

impl From<Subscription> for SubscriptionRow {
    fn from(s: Subscription) -> Self {
        Self {
            status: s.status.as_str().to_string(),
            started_at: s.started_at,
            expires_at: s.expires_at,
            billing_cycle: cycle_to_string(s.billing_cycle).to_string(),
        }
    }
}

impl SubscriptionRow {
    fn try_into_subscription(self) -> Result<Subscription, DbError> {
        Ok(Subscription {
            status: parse_status(&self.status)?,
            started_at: self.started_at,
            expires_at: self.expires_at,
            billing_cycle: parse_cycle(&self.billing_cycle)?,
        })
    }
}

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct ConsultorioRow {
    name: String,
    package_name: String,
    subscription: SubscriptionRow,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct ConsultorioRowWithId {
    record_id: String,
    name: String,
    package_name: String,
    subscription: SubscriptionRow,
    metadata: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ConsultorioRow {
    fn into_consultorio(self, id: Uuid) -> Result<Consultorio, DbError> {
        Ok(Consultorio {
            id,
            name: self.name,
            package_name: self.package_name,
            subscription: self.subscription.try_into_subscription()?,
            metadata: self.metadata,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl ConsultorioRowWithId {
    fn try_into_consultorio(self) -> Result<Consultorio, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid UUID: {e}")))?;
        ConsultorioRow {
            name: self.name,
            package_name: self.package_name,
            subscription: self.subscription,
            metadata: self.metadata,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_consultorio(id)
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Consultorio repository.
#[derive(Clone)]
pub struct SurrealConsultorioRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealConsultorioRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    async fn write_subscription(
        &self,
        id: Uuid,
        subscription: SubscriptionRow,
    ) -> ClinicaResult<Consultorio> {
        let result = self
            .db
            .query(
                "UPDATE type::record('consultorio', $id) SET \
                 subscription = $subscription, updated_at = time::now()",
            )
            .bind(("id", id.to_string()))
            .bind(("subscription", subscription))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(|e| DbError::Query(e.to_string()))?;

        self.get_by_id(id).await
    }
}

impl<C: Connection> ConsultorioRepository for SurrealConsultorioRepository<C> {
    async fn create(&self, input: CreateConsultorio) -> ClinicaResult<Consultorio> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let metadata = input
            .metadata
            .unwrap_or(serde_json::Value::Object(Default::default()));

        let result = self
            .db
            .query(
                "CREATE type::record('consultorio', $id) SET \
                 name = $name, package_name = $package_name, \
                 subscription = $subscription, \
                 metadata = $metadata",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("package_name", input.package_name))
            .bind(("subscription", SubscriptionRow::from(input.subscription)))
            .bind(("metadata", metadata))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<ConsultorioRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "consultorio".into(),
            id: id_str,
        })?;

        Ok(row.into_consultorio(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> ClinicaResult<Consultorio> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('consultorio', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ConsultorioRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "consultorio".into(),
            id: id_str,
        })?;

        Ok(row.into_consultorio(id)?)
    }

    async fn expire_if_lapsed(&self, id: Uuid) -> ClinicaResult<bool> {
        // Conditional on the stored status so concurrent calls apply
        // the transition at most once.
        let mut result = self
            .db
            .query(
                "UPDATE type::record('consultorio', $id) SET \
                 subscription.status = 'Expired', updated_at = time::now() \
                 WHERE subscription.status = 'Active' \
                 AND subscription.expires_at != NONE \
                 AND subscription.expires_at < $now",
            )
            .bind(("id", id.to_string()))
            .bind(("now", Utc::now()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ConsultorioRow> = result.take(0).map_err(DbError::from)?;
        Ok(!rows.is_empty())
    }

    async fn renew(&self, id: Uuid, expires_at: DateTime<Utc>) -> ClinicaResult<Consultorio> {
        let current = self.get_by_id(id).await?;
        let status = current.subscription.status;

        // Renewal while already Active just extends the expiry; every
        // other source status must have a legal edge to Active.
        if status != SubscriptionStatus::Active
            && !status.can_transition_to(SubscriptionStatus::Active)
        {
            return Err(DbError::InvalidTransition {
                from: status.as_str().into(),
                to: SubscriptionStatus::Active.as_str().into(),
            }
            .into());
        }

        let mut subscription = SubscriptionRow::from(current.subscription);
        subscription.status = SubscriptionStatus::Active.as_str().into();
        subscription.expires_at = Some(expires_at);

        self.write_subscription(id, subscription).await
    }

    async fn cancel_subscription(&self, id: Uuid) -> ClinicaResult<Consultorio> {
        let current = self.get_by_id(id).await?;
        let status = current.subscription.status;

        if !status.can_transition_to(SubscriptionStatus::Cancelled) {
            return Err(DbError::InvalidTransition {
                from: status.as_str().into(),
                to: SubscriptionStatus::Cancelled.as_str().into(),
            }
            .into());
        }

        let mut subscription = SubscriptionRow::from(current.subscription);
        subscription.status = SubscriptionStatus::Cancelled.as_str().into();

        self.write_subscription(id, subscription).await
    }

    async fn start_subscription(
        &self,
        id: Uuid,
        subscription: Subscription,
    ) -> ClinicaResult<Consultorio> {
        // A brand-new cycle replaces the record wholesale; this is the
        // only path out of Cancelled.
        self.write_subscription(id, SubscriptionRow::from(subscription))
            .await
    }

    async fn list(&self, pagination: Pagination) -> ClinicaResult<PaginatedResult<Consultorio>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM consultorio GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM consultorio \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ConsultorioRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_consultorio())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
