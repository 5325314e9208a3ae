//! Integration tests for the Entitlement Gate against in-memory
//! SurrealDB.

use chrono::{Duration, Utc};
use clinica_core::error::ClinicaError;
use clinica_core::models::consultorio::{
    BillingCycle, CreateConsultorio, Subscription, SubscriptionStatus,
};
use clinica_core::models::package::{CreatePackage, Feature, PackageFeatures, PackageLimits};
use clinica_core::models::staff::{CreateStaff, StaffKind};
use clinica_core::repository::{ConsultorioRepository, PackageRepository, StaffRepository};
use clinica_db::repository::{
    SurrealConsultorioRepository, SurrealPackageRepository, SurrealStaffRepository,
};
use clinica_guard::{EntitlementGate, FeatureDecision, ResourceKind};
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;
use uuid::Uuid;

type Db = surrealdb::engine::local::Db;
type Gate = EntitlementGate<
    SurrealConsultorioRepository<Db>,
    SurrealStaffRepository<Db>,
    SurrealPackageRepository<Db>,
>;

/// Helper: in-memory DB with one package and one subscribed
/// consultorio.
async fn setup(
    limits: PackageLimits,
    features: PackageFeatures,
    subscription: Subscription,
) -> (Surreal<Db>, Gate, Uuid) {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    clinica_db::run_migrations(&db).await.unwrap();

    let packages = SurrealPackageRepository::new(db.clone());
    packages
        .create(CreatePackage {
            name: "basico".into(),
            display_name: "Básico".into(),
            limits,
            features,
        })
        .await
        .unwrap();

    let consultorios = SurrealConsultorioRepository::new(db.clone());
    let consultorio = consultorios
        .create(CreateConsultorio {
            name: "Clínica Centro".into(),
            package_name: "basico".into(),
            subscription,
            metadata: None,
        })
        .await
        .unwrap();

    let gate = EntitlementGate::new(
        consultorios,
        SurrealStaffRepository::new(db.clone()),
        SurrealPackageRepository::new(db.clone()),
    );
    (db, gate, consultorio.id)
}

fn active(expires_in_hours: i64) -> Subscription {
    Subscription {
        status: SubscriptionStatus::Active,
        started_at: Utc::now() - Duration::days(30),
        expires_at: Some(Utc::now() + Duration::hours(expires_in_hours)),
        billing_cycle: BillingCycle::Monthly,
    }
}

async fn hire(db: &Surreal<Db>, consultorio_id: Uuid, email: &str, kind: StaffKind) {
    SurrealStaffRepository::new(db.clone())
        .create(CreateStaff {
            consultorio_id,
            name: "Dr. García".into(),
            email: email.into(),
            kind,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn limit_check_blocks_at_exact_boundary() {
    let (db, gate, consultorio_id) = setup(
        PackageLimits {
            doctors: Some(1),
            ..Default::default()
        },
        PackageFeatures::default(),
        active(24),
    )
    .await;

    let before = gate
        .check_limit(consultorio_id, ResourceKind::Doctor)
        .await
        .unwrap();
    assert!(before.permitted);
    assert_eq!(before.current, 0);
    assert_eq!(before.limit, Some(1));

    hire(&db, consultorio_id, "a@clinic.test", StaffKind::Doctor).await;

    // current == limit must deny: the check gates the next creation.
    let at_limit = gate
        .check_limit(consultorio_id, ResourceKind::Doctor)
        .await
        .unwrap();
    assert!(!at_limit.permitted);
    assert_eq!(at_limit.current, 1);
}

#[tokio::test]
async fn absent_limit_always_permits() {
    let (db, gate, consultorio_id) = setup(
        PackageLimits::default(),
        PackageFeatures::default(),
        active(24),
    )
    .await;

    for i in 0..5 {
        hire(
            &db,
            consultorio_id,
            &format!("dr{i}@clinic.test"),
            StaffKind::Doctor,
        )
        .await;
    }

    let decision = gate
        .check_limit(consultorio_id, ResourceKind::Doctor)
        .await
        .unwrap();
    assert!(decision.permitted);
    assert_eq!(decision.current, 5);
    assert_eq!(decision.limit, None);
}

#[tokio::test]
async fn limit_dimensions_are_independent() {
    let (db, gate, consultorio_id) = setup(
        PackageLimits {
            doctors: Some(1),
            receptionists: Some(2),
            consultorios: None,
        },
        PackageFeatures::default(),
        active(24),
    )
    .await;

    hire(&db, consultorio_id, "a@clinic.test", StaffKind::Doctor).await;

    assert!(
        !gate
            .check_limit(consultorio_id, ResourceKind::Doctor)
            .await
            .unwrap()
            .permitted
    );
    assert!(
        gate.check_limit(consultorio_id, ResourceKind::Receptionist)
            .await
            .unwrap()
            .permitted
    );
}

#[tokio::test]
async fn feature_decision_follows_the_package_flag() {
    let (db, gate, consultorio_id) = setup(
        PackageLimits::default(),
        PackageFeatures {
            document_upload: true,
            ..Default::default()
        },
        active(24),
    )
    .await;

    assert_eq!(
        gate.check_feature(consultorio_id, "document_upload")
            .await
            .unwrap(),
        FeatureDecision::Enabled
    );
    assert!(matches!(
        gate.check_feature(consultorio_id, "advanced_reports")
            .await
            .unwrap(),
        FeatureDecision::Disabled {
            feature: Feature::AdvancedReports,
            ..
        }
    ));

    // Flipping the flag changes the decision on the next check.
    SurrealPackageRepository::new(db)
        .update_features(
            "basico",
            PackageFeatures {
                document_upload: true,
                advanced_reports: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(
        gate.check_feature(consultorio_id, "advanced_reports")
            .await
            .unwrap(),
        FeatureDecision::Enabled
    );
}

#[tokio::test]
async fn unknown_feature_key_is_tagged_not_silently_denied() {
    let (_db, gate, consultorio_id) = setup(
        PackageLimits::default(),
        PackageFeatures::default(),
        active(24),
    )
    .await;

    let decision = gate
        .check_feature(consultorio_id, "document_uplaod")
        .await
        .unwrap();
    assert_eq!(
        decision,
        FeatureDecision::Unknown {
            feature: "document_uplaod".into()
        }
    );
}

#[tokio::test]
async fn active_subscription_passes() {
    let (_db, gate, consultorio_id) = setup(
        PackageLimits::default(),
        PackageFeatures::default(),
        active(24),
    )
    .await;

    gate.check_subscription_active(consultorio_id).await.unwrap();
}

#[tokio::test]
async fn trial_is_active_equivalent() {
    let (_db, gate, consultorio_id) = setup(
        PackageLimits::default(),
        PackageFeatures::default(),
        Subscription {
            status: SubscriptionStatus::Trial,
            started_at: Utc::now(),
            expires_at: None,
            billing_cycle: BillingCycle::Monthly,
        },
    )
    .await;

    gate.check_subscription_active(consultorio_id).await.unwrap();
}

#[tokio::test]
async fn lapsed_subscription_is_denied_and_recorded_as_expired() {
    let (db, gate, consultorio_id) = setup(
        PackageLimits::default(),
        PackageFeatures::default(),
        active(-1),
    )
    .await;

    let err = gate
        .check_subscription_active(consultorio_id)
        .await
        .unwrap_err();
    assert!(
        matches!(err, ClinicaError::SubscriptionExpired { .. }),
        "{err:?}"
    );

    // The lazy transition persisted.
    let stored = SurrealConsultorioRepository::new(db)
        .get_by_id(consultorio_id)
        .await
        .unwrap();
    assert_eq!(stored.subscription.status, SubscriptionStatus::Expired);

    // And the check keeps denying.
    assert!(gate.check_subscription_active(consultorio_id).await.is_err());
}

#[tokio::test]
async fn cancelled_subscription_is_denied() {
    let (db, gate, consultorio_id) = setup(
        PackageLimits::default(),
        PackageFeatures::default(),
        active(24),
    )
    .await;

    SurrealConsultorioRepository::new(db)
        .cancel_subscription(consultorio_id)
        .await
        .unwrap();

    let err = gate
        .check_subscription_active(consultorio_id)
        .await
        .unwrap_err();
    assert!(
        matches!(
            err,
            ClinicaError::SubscriptionExpired { ref status } if status == "Cancelled"
        ),
        "{err:?}"
    );
}

#[tokio::test]
async fn dangling_package_reference_surfaces_as_not_found() {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    clinica_db::run_migrations(&db).await.unwrap();

    // Consultorio subscribed to a package that was never created.
    let consultorios = SurrealConsultorioRepository::new(db.clone());
    let consultorio = consultorios
        .create(CreateConsultorio {
            name: "Clínica Centro".into(),
            package_name: "deleted-tier".into(),
            subscription: active(24),
            metadata: None,
        })
        .await
        .unwrap();

    let gate = EntitlementGate::new(
        consultorios,
        SurrealStaffRepository::new(db.clone()),
        SurrealPackageRepository::new(db),
    );

    let err = gate
        .check_limit(consultorio.id, ResourceKind::Doctor)
        .await
        .unwrap_err();
    assert!(matches!(err, ClinicaError::NotFound { .. }), "{err:?}");
}
