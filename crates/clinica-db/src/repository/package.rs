//! SurrealDB implementation of [`PackageRepository`].

use chrono::{DateTime, Utc};
use clinica_core::error::ClinicaResult;
use clinica_core::models::package::{CreatePackage, Package, PackageFeatures, PackageLimits};
use clinica_core::repository::{PackageRepository, PaginatedResult, Pagination};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, Clone, SurrealValue)]
struct LimitsRow {
    doctors: Option<u32>,
    receptionists: Option<u32>,
    consultorios: Option<u32>,
}

impl From<PackageLimits> for LimitsRow {
    fn from(l: PackageLimits) -> Self {
        Self {
            doctors: l.doctors,
            receptionists: l.receptionists,
            consultorios: l.consultorios,
        }
    }
}

impl From<LimitsRow> for PackageLimits {
    fn from(l: LimitsRow) -> Self {
        Self {
            doctors: l.doctors,
            receptionists: l.receptionists,
            consultorios: l.consultorios,
        }
    }
}

#[derive(Debug, Clone, SurrealValue)]
struct FeaturesRow {
    document_upload: bool,
    image_upload: bool,
    advanced_reports: bool,
    integrations: bool,
    priority_support: bool,
}

impl From<PackageFeatures> for FeaturesRow {
    fn from(f: PackageFeatures) -> Self {
        Self {
            document_upload: f.document_upload,
            image_upload: f.image_upload,
            advanced_reports: f.advanced_reports,
            integrations: f.integrations,
            priority_support: f.priority_support,
        }
    }
}

impl From<FeaturesRow> for PackageFeatures {
    fn from(f: FeaturesRow) -> Self {
        Self {
            document_upload: f.document_upload,
            image_upload: f.image_upload,
            advanced_reports: f.advanced_reports,
            integrations: f.integrations,
            priority_support: f.priority_support,
        }
    }
}

/// DB-side row struct for queries where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct PackageRow {
    name: String,
    display_name: String,
    limits: LimitsRow,
    features: FeaturesRow,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// DB-side row struct that includes the record ID via `meta::id(id)`.
#[derive(Debug, SurrealValue)]
struct PackageRowWithId {
    record_id: String,
    name: String,
    display_name: String,
    limits: LimitsRow,
    features: FeaturesRow,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PackageRow {
    fn into_package(self, id: Uuid) -> Package {
        Package {
            id,
            name: self.name,
            display_name: self.display_name,
            limits: self.limits.into(),
            features: self.features.into(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl PackageRowWithId {
    fn try_into_package(self) -> Result<Package, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid UUID: {e}")))?;
        Ok(PackageRow {
            name: self.name,
            display_name: self.display_name,
            limits: self.limits,
            features: self.features,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
        .into_package(id))
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Package repository.
#[derive(Clone)]
pub struct SurrealPackageRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealPackageRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> PackageRepository for SurrealPackageRepository<C> {
    async fn create(&self, input: CreatePackage) -> ClinicaResult<Package> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('package', $id) SET \
                 name = $name, display_name = $display_name, \
                 limits = $limits, features = $features",
            )
            .bind(("id", id_str.clone()))
            .bind(("name", input.name))
            .bind(("display_name", input.display_name))
            .bind(("limits", LimitsRow::from(input.limits)))
            .bind(("features", FeaturesRow::from(input.features)))
            .await
            .map_err(DbError::from)?;

        let mut result = result.check().map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<PackageRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "package".into(),
            id: id_str,
        })?;

        Ok(row.into_package(id))
    }

    async fn find_by_name(&self, name: &str) -> ClinicaResult<Package> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM package \
                 WHERE name = $name",
            )
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PackageRowWithId> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "package".into(),
            id: format!("name={name}"),
        })?;

        Ok(row.try_into_package()?)
    }

    async fn update_features(
        &self,
        name: &str,
        features: PackageFeatures,
    ) -> ClinicaResult<Package> {
        let result = self
            .db
            .query(
                "UPDATE package SET \
                 features = $features, updated_at = time::now() \
                 WHERE name = $name",
            )
            .bind(("name", name.to_string()))
            .bind(("features", FeaturesRow::from(features)))
            .await
            .map_err(DbError::from)?;

        result.check().map_err(|e| DbError::Query(e.to_string()))?;

        self.find_by_name(name).await
    }

    async fn list(&self, pagination: Pagination) -> ClinicaResult<PaginatedResult<Package>> {
        let mut count_result = self
            .db
            .query("SELECT count() AS total FROM package GROUP ALL")
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM package \
                 ORDER BY name ASC \
                 LIMIT $limit START $offset",
            )
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<PackageRowWithId> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(|row| row.try_into_package())
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
