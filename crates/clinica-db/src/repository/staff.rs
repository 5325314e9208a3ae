//! SurrealDB implementation of [`StaffRepository`].

use chrono::{DateTime, Utc};
use clinica_core::error::ClinicaResult;
use clinica_core::models::staff::{CreateStaff, Staff, StaffKind, StaffStatus};
use clinica_core::repository::{PaginatedResult, Pagination, StaffRepository};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct StaffRow {
    consultorio_id: String,
    name: String,
    email: String,
    kind: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct StaffRowWithId {
    record_id: String,
    consultorio_id: String,
    name: String,
    email: String,
    kind: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_kind(s: &str) -> Result<StaffKind, DbError> {
    match s {
        "Doctor" => Ok(StaffKind::Doctor),
        "Receptionist" => Ok(StaffKind::Receptionist),
        "Admin" => Ok(StaffKind::Admin),
        other => Err(DbError::Decode(format!("unknown staff kind: {other}"))),
    }
}

fn kind_to_string(k: StaffKind) -> &'static str {
    match k {
        StaffKind::Doctor => "Doctor",
        StaffKind::Receptionist => "Receptionist",
        StaffKind::Admin => "Admin",
    }
}

fn parse_status(s: &str) -> Result<StaffStatus, DbError> {
    match s {
        "Active" => Ok(StaffStatus::Active),
        "Inactive" => Ok(StaffStatus::Inactive),
        other => Err(DbError::Decode(format!("unknown staff status: {other}"))),
    }
}

impl StaffRow {
    fn into_staff(self, id: Uuid) -> Result<Staff, DbError> {
        let consultorio_id = Uuid::parse_str(&self.consultorio_id)
            .map_err(|e| DbError::Decode(format!("invalid consultorio UUID: {e}")))?;
        Ok(Staff {
            id,
            consultorio_id,
            name: self.name,
            email: self.email,
            kind: parse_kind(&self.kind)?,
            status: parse_status(&self.status)?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl StaffRowWithId {
    fn try_into_staff(self) -> Result<Staff, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid UUID: {e}")))?;
        StaffRow {
            consultorio_id: self.consultorio_id,
            name: self.name,
            email: self.email,
            kind: self.kind,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_staff(id)
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Staff repository.
#[derive(Clone)]
pub struct SurrealStaffRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealStaffRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> StaffRepository for SurrealStaffRepository<C> {
    async fn create(&self, input: CreateStaff) -> ClinicaResult<Staff> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('staff', $id) SET \
                 consultorio_id = $consultorio_id, \
                 name = $name, email = $email, \
                 kind = $kind, status = 'Active'",
            )
            .bind(("id", id_str.clone()))
            .bind(("consultorio_id", input.consultorio_id.to_string()))
            .bind(("name", input.name))
            .bind(("email", input.email))
            .bind(("kind", kind_to_string(input.kind).to_string()))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<StaffRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "staff".into(),
            id: id_str,
        })?;

        Ok(row.into_staff(id)?)
    }

    async fn get_by_id(&self, consultorio_id: Uuid, id: Uuid) -> ClinicaResult<Staff> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query(
                "SELECT * FROM type::record('staff', $id) \
                 WHERE consultorio_id = $consultorio_id",
            )
            .bind(("id", id_str.clone()))
            .bind(("consultorio_id", consultorio_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<StaffRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "staff".into(),
            id: id_str,
        })?;

        Ok(row.into_staff(id)?)
    }

    async fn count_active_by_kind(
        &self,
        consultorio_id: Uuid,
        kind: StaffKind,
    ) -> ClinicaResult<u64> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM staff \
                 WHERE consultorio_id = $consultorio_id \
                 AND kind = $kind AND status = 'Active' \
                 GROUP ALL",
            )
            .bind(("consultorio_id", consultorio_id.to_string()))
            .bind(("kind", kind_to_string(kind).to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }

    async fn deactivate(&self, consultorio_id: Uuid, id: Uuid) -> ClinicaResult<()> {
        self.db
            .query(
                "UPDATE type::record('staff', $id) SET \
                 status = 'Inactive', updated_at = time::now() \
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
    ) -> ClinicaResult<PaginatedResult<Staff>> {
        let consultorio_str = consultorio_id.to_string();

        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM staff \
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
                "SELECT meta::id(id) AS record_id, * FROM staff \
                 WHERE consultorio_id = $consultorio_id \
                 ORDER BY created_at ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("consultorio_id", consultorio_str))
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<StaffRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_staff())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
