//! Integration tests for the Consultorio repository and its
//! subscription state machine, using in-memory SurrealDB.

use chrono::{Duration, Utc};
use clinica_core::error::ClinicaError;
use clinica_core::models::consultorio::{
    BillingCycle, CreateConsultorio, Subscription, SubscriptionStatus,
};
use clinica_core::repository::ConsultorioRepository;
use clinica_db::repository::SurrealConsultorioRepository;
use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

async fn setup() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    clinica_db::run_migrations(&db).await.unwrap();
    db
}

fn subscription(status: SubscriptionStatus, expires_in_hours: i64) -> Subscription {
    Subscription {
        status,
        started_at: Utc::now() - Duration::days(30),
        expires_at: Some(Utc::now() + Duration::hours(expires_in_hours)),
        billing_cycle: BillingCycle::Monthly,
    }
}

fn clinic(subscription: Subscription) -> CreateConsultorio {
    CreateConsultorio {
        name: "Clínica Centro".into(),
        package_name: "basico".into(),
        subscription,
        metadata: None,
    }
}

#[tokio::test]
async fn create_and_get_consultorio() {
    let db = setup().await;
    let repo = SurrealConsultorioRepository::new(db);

    let created = repo
        .create(clinic(subscription(SubscriptionStatus::Active, 24)))
        .await
        .unwrap();
    assert_eq!(created.name, "Clínica Centro");
    assert_eq!(created.package_name, "basico");
    assert_eq!(created.subscription.status, SubscriptionStatus::Active);

    let fetched = repo.get_by_id(created.id).await.unwrap();
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.subscription.status, SubscriptionStatus::Active);
}

#[tokio::test]
async fn expire_if_lapsed_transitions_only_lapsed_active() {
    let db = setup().await;
    let repo = SurrealConsultorioRepository::new(db);

    // Active with an expiry in the past.
    let lapsed = repo
        .create(clinic(subscription(SubscriptionStatus::Active, -1)))
        .await
        .unwrap();
    assert!(repo.expire_if_lapsed(lapsed.id).await.unwrap());
    assert_eq!(
        repo.get_by_id(lapsed.id).await.unwrap().subscription.status,
        SubscriptionStatus::Expired
    );

    // A second call finds nothing to do.
    assert!(!repo.expire_if_lapsed(lapsed.id).await.unwrap());

    // Active with a future expiry is untouched.
    let healthy = repo
        .create(clinic(subscription(SubscriptionStatus::Active, 24)))
        .await
        .unwrap();
    assert!(!repo.expire_if_lapsed(healthy.id).await.unwrap());
    assert_eq!(
        repo.get_by_id(healthy.id)
            .await
            .unwrap()
            .subscription
            .status,
        SubscriptionStatus::Active
    );
}

#[tokio::test]
async fn expire_if_lapsed_never_touches_open_ended_subscriptions() {
    let db = setup().await;
    let repo = SurrealConsultorioRepository::new(db);

    let mut sub = subscription(SubscriptionStatus::Active, 0);
    sub.expires_at = None;
    let comped = repo.create(clinic(sub)).await.unwrap();

    assert!(!repo.expire_if_lapsed(comped.id).await.unwrap());
    assert_eq!(
        repo.get_by_id(comped.id).await.unwrap().subscription.status,
        SubscriptionStatus::Active
    );
}

#[tokio::test]
async fn renew_reactivates_expired_subscription() {
    let db = setup().await;
    let repo = SurrealConsultorioRepository::new(db);

    let consultorio = repo
        .create(clinic(subscription(SubscriptionStatus::Expired, -1)))
        .await
        .unwrap();

    let new_expiry = Utc::now() + Duration::days(30);
    let renewed = repo.renew(consultorio.id, new_expiry).await.unwrap();
    assert_eq!(renewed.subscription.status, SubscriptionStatus::Active);
    assert!(renewed.subscription.expires_at.unwrap() > Utc::now());
}

#[tokio::test]
async fn renew_is_illegal_from_cancelled() {
    let db = setup().await;
    let repo = SurrealConsultorioRepository::new(db);

    let consultorio = repo
        .create(clinic(subscription(SubscriptionStatus::Active, 24)))
        .await
        .unwrap();
    repo.cancel_subscription(consultorio.id).await.unwrap();

    let err = repo
        .renew(consultorio.id, Utc::now() + Duration::days(30))
        .await
        .unwrap_err();
    assert!(
        matches!(err, ClinicaError::InvalidTransition { .. }),
        "{err:?}"
    );
}

#[tokio::test]
async fn cancel_is_legal_only_from_trial_or_active() {
    let db = setup().await;
    let repo = SurrealConsultorioRepository::new(db);

    let trial = repo
        .create(clinic(subscription(SubscriptionStatus::Trial, 24)))
        .await
        .unwrap();
    let cancelled = repo.cancel_subscription(trial.id).await.unwrap();
    assert_eq!(
        cancelled.subscription.status,
        SubscriptionStatus::Cancelled
    );

    // Cancelling twice has no legal edge.
    let err = repo.cancel_subscription(trial.id).await.unwrap_err();
    assert!(
        matches!(err, ClinicaError::InvalidTransition { .. }),
        "{err:?}"
    );

    let expired = repo
        .create(clinic(subscription(SubscriptionStatus::Expired, -1)))
        .await
        .unwrap();
    assert!(repo.cancel_subscription(expired.id).await.is_err());
}

#[tokio::test]
async fn start_subscription_is_the_only_way_out_of_cancelled() {
    let db = setup().await;
    let repo = SurrealConsultorioRepository::new(db);

    let consultorio = repo
        .create(clinic(subscription(SubscriptionStatus::Trial, 24)))
        .await
        .unwrap();
    repo.cancel_subscription(consultorio.id).await.unwrap();

    let fresh = repo
        .start_subscription(
            consultorio.id,
            Subscription {
                status: SubscriptionStatus::Active,
                started_at: Utc::now(),
                expires_at: Some(Utc::now() + Duration::days(365)),
                billing_cycle: BillingCycle::Yearly,
            },
        )
        .await
        .unwrap();
    assert_eq!(fresh.subscription.status, SubscriptionStatus::Active);
    assert_eq!(fresh.subscription.billing_cycle, BillingCycle::Yearly);
}
