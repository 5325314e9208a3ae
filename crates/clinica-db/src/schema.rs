//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode for data integrity.
//! UUIDs are stored as strings. Enums are stored as strings with
//! ASSERT constraints for validation.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1 — initial table definitions
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Packages (global scope, shared reference data)
-- =======================================================================
DEFINE TABLE package SCHEMAFULL;
DEFINE FIELD name ON TABLE package TYPE string;
DEFINE FIELD display_name ON TABLE package TYPE string;
DEFINE FIELD limits ON TABLE package TYPE object;
DEFINE FIELD limits.doctors ON TABLE package TYPE option<int>;
DEFINE FIELD limits.receptionists ON TABLE package TYPE option<int>;
DEFINE FIELD limits.consultorios ON TABLE package TYPE option<int>;
DEFINE FIELD features ON TABLE package TYPE object;
DEFINE FIELD features.document_upload ON TABLE package TYPE bool \
    DEFAULT false;
DEFINE FIELD features.image_upload ON TABLE package TYPE bool \
    DEFAULT false;
DEFINE FIELD features.advanced_reports ON TABLE package TYPE bool \
    DEFAULT false;
DEFINE FIELD features.integrations ON TABLE package TYPE bool \
    DEFAULT false;
DEFINE FIELD features.priority_support ON TABLE package TYPE bool \
    DEFAULT false;
DEFINE FIELD created_at ON TABLE package TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE package TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_package_name ON TABLE package COLUMNS name UNIQUE;

-- =======================================================================
-- Consultorios (global scope, tenant root)
-- =======================================================================
DEFINE TABLE consultorio SCHEMAFULL;
DEFINE FIELD name ON TABLE consultorio TYPE string;
DEFINE FIELD package_name ON TABLE consultorio TYPE string;
DEFINE FIELD subscription ON TABLE consultorio TYPE object;
DEFINE FIELD subscription.status ON TABLE consultorio TYPE string \
    ASSERT $value IN ['Trial', 'Active', 'Expired', 'Cancelled'];
DEFINE FIELD subscription.started_at ON TABLE consultorio TYPE datetime;
DEFINE FIELD subscription.expires_at ON TABLE consultorio \
    TYPE option<datetime>;
DEFINE FIELD subscription.billing_cycle ON TABLE consultorio TYPE string \
    ASSERT $value IN ['Monthly', 'Yearly'];
DEFINE FIELD metadata ON TABLE consultorio TYPE object FLEXIBLE \
    DEFAULT {};
DEFINE FIELD created_at ON TABLE consultorio TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE consultorio TYPE datetime \
    DEFAULT time::now();

-- =======================================================================
-- Staff (consultorio scope)
-- =======================================================================
DEFINE TABLE staff SCHEMAFULL;
DEFINE FIELD consultorio_id ON TABLE staff TYPE string;
DEFINE FIELD name ON TABLE staff TYPE string;
DEFINE FIELD email ON TABLE staff TYPE string;
DEFINE FIELD kind ON TABLE staff TYPE string \
    ASSERT $value IN ['Doctor', 'Receptionist', 'Admin'];
DEFINE FIELD status ON TABLE staff TYPE string \
    ASSERT $value IN ['Active', 'Inactive'];
DEFINE FIELD created_at ON TABLE staff TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE staff TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_staff_consultorio_email ON TABLE staff \
    COLUMNS consultorio_id, email UNIQUE;
DEFINE INDEX idx_staff_consultorio_kind ON TABLE staff \
    COLUMNS consultorio_id, kind, status;

-- =======================================================================
-- Appointments (consultorio scope)
-- =======================================================================
DEFINE TABLE appointment SCHEMAFULL;
DEFINE FIELD consultorio_id ON TABLE appointment TYPE string;
DEFINE FIELD practitioner_id ON TABLE appointment TYPE string;
DEFINE FIELD patient_id ON TABLE appointment TYPE string;
DEFINE FIELD day ON TABLE appointment TYPE datetime;
DEFINE FIELD time ON TABLE appointment TYPE string;
DEFINE FIELD reason ON TABLE appointment TYPE option<string>;
DEFINE FIELD notes ON TABLE appointment TYPE option<string>;
DEFINE FIELD status ON TABLE appointment TYPE string \
    ASSERT $value IN ['Pending', 'Confirmed', 'Completed', 'Cancelled'];
DEFINE FIELD created_at ON TABLE appointment TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE appointment TYPE datetime \
    DEFAULT time::now();
-- Not unique: cancelled appointments legitimately share a slot key.
-- Slot exclusivity is enforced transactionally on insert/reschedule.
DEFINE INDEX idx_appointment_slot ON TABLE appointment \
    COLUMNS practitioner_id, day, time;
DEFINE INDEX idx_appointment_consultorio ON TABLE appointment \
    COLUMNS consultorio_id;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
/// All DEFINE statements are idempotent so re-running is safe.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    // Ensure migration tracking table exists (idempotent).
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    // Determine current schema version.
    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            // Record the applied migration.
            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
///
/// Exposed for testing with in-memory SurrealDB instances that
/// bypass the migration runner.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
