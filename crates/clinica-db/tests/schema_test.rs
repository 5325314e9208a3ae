//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    clinica_db::run_migrations(&db).await.unwrap();

    // Verify that key tables exist by querying INFO FOR DB.
    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info = info.expect("INFO FOR DB should return a value");
    let info_str = format!("{:?}", info);

    assert!(info_str.contains("package"), "missing package table");
    assert!(
        info_str.contains("consultorio"),
        "missing consultorio table"
    );
    assert!(info_str.contains("staff"), "missing staff table");
    assert!(
        info_str.contains("appointment"),
        "missing appointment table"
    );
    assert!(
        info_str.contains("_migration"),
        "missing _migration tracking table"
    );
}

#[tokio::test]
async fn schema_migration_is_idempotent() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();

    clinica_db::run_migrations(&db).await.unwrap();
    // Running again must be a no-op, not an error.
    clinica_db::run_migrations(&db).await.unwrap();

    let mut result = db
        .query("SELECT count() AS total FROM _migration GROUP ALL")
        .await
        .unwrap();
    let rows: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    let row_str = format!("{:?}", rows);
    assert!(
        row_str.contains("1"),
        "each migration should be recorded exactly once: {row_str}"
    );
}

#[tokio::test]
async fn package_name_is_unique() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    clinica_db::run_migrations(&db).await.unwrap();

    use clinica_core::models::package::{CreatePackage, PackageFeatures, PackageLimits};
    use clinica_core::repository::PackageRepository;
    use clinica_db::repository::SurrealPackageRepository;

    let repo = SurrealPackageRepository::new(db);
    let input = CreatePackage {
        name: "basico".into(),
        display_name: "Básico".into(),
        limits: PackageLimits::default(),
        features: PackageFeatures::default(),
    };

    repo.create(input.clone()).await.unwrap();
    assert!(
        repo.create(input).await.is_err(),
        "duplicate package slug should be rejected by the unique index"
    );
}
