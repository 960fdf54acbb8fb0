//! Integration tests for the product repository: guarded status
//! transitions, filtered listings, and the stock aggregation.

use chrono::Utc;
use stockroom_core::models::dispatch_guide::CreateDispatchGuide;
use stockroom_core::models::product::{
    AssignmentSnapshot, CreateProduct, ProductFilter, ProductStatus, ProductType,
};
use stockroom_core::models::product_model::CreateProductModel;
use stockroom_core::repository::{
    DispatchGuideRepository, ProductModelRepository, ProductRepository,
};
use stockroom_db::repository::{
    SurrealDispatchGuideRepository, SurrealProductModelRepository, SurrealProductRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

struct TestEnv {
    products: SurrealProductRepository<Db>,
    model_id: Uuid,
    guide_id: Uuid,
}

async fn setup() -> TestEnv {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    stockroom_db::run_migrations(&db).await.unwrap();

    let models = SurrealProductModelRepository::new(db.clone());
    let model = models
        .create(CreateProductModel {
            name: "Dock Station".into(),
            description: None,
            part_number: "DS-40".into(),
            created_by: None,
        })
        .await
        .unwrap();

    let guides = SurrealDispatchGuideRepository::new(db.clone());
    let guide = guides
        .create(CreateDispatchGuide {
            guide_number: "GD-9".into(),
            vendor: "Acme".into(),
            dispatch_date: Utc::now(),
            file_name: "gd-9.pdf".into(),
            stored_file_name: "stored-gd-9.pdf".into(),
            file_size: None,
            mime_type: None,
            uploaded_by: Uuid::new_v4(),
        })
        .await
        .unwrap();

    TestEnv {
        products: SurrealProductRepository::new(db),
        model_id: model.id,
        guide_id: guide.id,
    }
}

fn create_input(env: &TestEnv, serial: &str, product_type: ProductType) -> CreateProduct {
    CreateProduct {
        product_model_id: env.model_id,
        name: "Dock Station".into(),
        description: None,
        product_type,
        is_serialized: true,
        serial_number: Some(serial.into()),
        quantity: 1,
        part_number: "DS-40".into(),
        inventory_number: None,
        rental_id: match product_type {
            ProductType::Rental => Some("R-1".into()),
            ProductType::Purchased => None,
        },
        dispatch_guide_id: env.guide_id,
        created_by: None,
    }
}

fn snapshot(name: &str) -> AssignmentSnapshot {
    AssignmentSnapshot {
        assigned_to: name.into(),
        assigned_email: Some(format!("{name}@example.com")),
        assigned_ad_account: None,
        location: "HQ".into(),
        assignment_date: Utc::now(),
    }
}

#[tokio::test]
async fn guarded_assign_applies_once() {
    let env = setup().await;
    let product = env
        .products
        .create(create_input(&env, "G-1", ProductType::Purchased))
        .await
        .unwrap();

    // First transition wins.
    let first = env
        .products
        .mark_assigned(product.id, snapshot("ana"))
        .await
        .unwrap();
    assert!(first.is_some());
    assert_eq!(first.unwrap().status, ProductStatus::Assigned);

    // Second racer observes the guard and loses.
    let second = env
        .products
        .mark_assigned(product.id, snapshot("pedro"))
        .await
        .unwrap();
    assert!(second.is_none());

    // The winner's snapshot survived.
    let fetched = env.products.get_by_id(product.id).await.unwrap();
    assert_eq!(
        fetched.current_assignment.unwrap().assigned_to,
        "ana"
    );
}

#[tokio::test]
async fn guarded_release_requires_active_snapshot() {
    let env = setup().await;
    let product = env
        .products
        .create(create_input(&env, "G-2", ProductType::Purchased))
        .await
        .unwrap();

    // Nothing to release yet.
    let released = env.products.mark_available(product.id).await.unwrap();
    assert!(released.is_none());

    env.products
        .mark_assigned(product.id, snapshot("ana"))
        .await
        .unwrap();
    let released = env.products.mark_available(product.id).await.unwrap();
    assert!(released.is_some());
    let released = released.unwrap();
    assert_eq!(released.status, ProductStatus::Available);
    assert!(released.current_assignment.is_none());
}

#[tokio::test]
async fn guarded_decommission_requires_available() {
    let env = setup().await;
    let product = env
        .products
        .create(create_input(&env, "G-3", ProductType::Purchased))
        .await
        .unwrap();

    env.products
        .mark_assigned(product.id, snapshot("ana"))
        .await
        .unwrap();

    // Assigned products cannot be retired at the store layer either.
    let retired = env
        .products
        .mark_decommissioned(product.id, "broken".into(), Utc::now(), Uuid::new_v4())
        .await
        .unwrap();
    assert!(retired.is_none());

    env.products.mark_available(product.id).await.unwrap();
    let retired = env
        .products
        .mark_decommissioned(product.id, "broken".into(), Utc::now(), Uuid::new_v4())
        .await
        .unwrap();
    assert!(retired.is_some());

    // Terminal: a second retirement matches nothing.
    let again = env
        .products
        .mark_decommissioned(product.id, "again".into(), Utc::now(), Uuid::new_v4())
        .await
        .unwrap();
    assert!(again.is_none());
}

#[tokio::test]
async fn existing_serials_reports_only_collisions() {
    let env = setup().await;
    env.products
        .create(create_input(&env, "S-1", ProductType::Purchased))
        .await
        .unwrap();
    env.products
        .create(create_input(&env, "S-2", ProductType::Purchased))
        .await
        .unwrap();

    let existing = env
        .products
        .existing_serials(&["S-1".into(), "S-3".into(), "S-2".into()])
        .await
        .unwrap();
    let mut existing = existing;
    existing.sort();
    assert_eq!(existing, vec!["S-1".to_string(), "S-2".to_string()]);
}

#[tokio::test]
async fn list_filters_by_type_status_and_search() {
    let env = setup().await;
    let purchased = env
        .products
        .create(create_input(&env, "LAP-001", ProductType::Purchased))
        .await
        .unwrap();
    env.products
        .create(create_input(&env, "LAP-002", ProductType::Rental))
        .await
        .unwrap();
    env.products
        .mark_assigned(purchased.id, snapshot("ana"))
        .await
        .unwrap();

    // By type.
    let rentals = env
        .products
        .list(ProductFilter {
            product_type: Some(ProductType::Rental),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(rentals.len(), 1);
    assert_eq!(rentals[0].serial_number.as_deref(), Some("LAP-002"));

    // By status set (comma-separated on the wire).
    let active = env
        .products
        .list(ProductFilter {
            statuses: vec![ProductStatus::Available, ProductStatus::Assigned],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(active.len(), 2);

    let assigned = env
        .products
        .list(ProductFilter {
            statuses: vec![ProductStatus::Assigned],
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(assigned.len(), 1);

    // Case-insensitive search over the serial number.
    let found = env
        .products
        .list(ProductFilter {
            search: Some("lap-001".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, purchased.id);

    // Search also matches the denormalized name.
    let by_name = env
        .products
        .list(ProductFilter {
            search: Some("dock".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_name.len(), 2);
}

#[tokio::test]
async fn stock_summary_aggregates_by_model() {
    let env = setup().await;
    let a = env
        .products
        .create(create_input(&env, "ST-1", ProductType::Purchased))
        .await
        .unwrap();
    env.products
        .create(create_input(&env, "ST-2", ProductType::Purchased))
        .await
        .unwrap();
    env.products
        .create(create_input(&env, "ST-3", ProductType::Rental))
        .await
        .unwrap();

    env.products.mark_assigned(a.id, snapshot("ana")).await.unwrap();

    let summary = env.products.stock_summary().await.unwrap();
    assert_eq!(summary.len(), 1);
    let row = &summary[0];
    assert_eq!(row.name, "Dock Station");
    assert_eq!(row.part_number, "DS-40");
    assert_eq!(row.totals.total, 3);
    assert_eq!(row.totals.available, 2);
    assert_eq!(row.totals.assigned, 1);
    assert_eq!(row.totals.decommissioned, 0);
    assert_eq!(row.type_breakdown.purchased, 2);
    assert_eq!(row.type_breakdown.rental, 1);
}

#[tokio::test]
async fn stock_summary_counts_quantity_tracked_units() {
    let env = setup().await;
    let mut bulk = create_input(&env, "ignored", ProductType::Purchased);
    bulk.is_serialized = false;
    bulk.serial_number = None;
    bulk.quantity = 25;
    env.products.create(bulk).await.unwrap();

    let summary = env.products.stock_summary().await.unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].totals.total, 25);
    assert_eq!(summary[0].totals.available, 25);
}

#[tokio::test]
async fn counts_by_guide_and_model() {
    let env = setup().await;
    env.products
        .create(create_input(&env, "C-1", ProductType::Purchased))
        .await
        .unwrap();
    env.products
        .create(create_input(&env, "C-2", ProductType::Purchased))
        .await
        .unwrap();

    assert_eq!(
        env.products
            .count_by_dispatch_guide(env.guide_id)
            .await
            .unwrap(),
        2
    );
    assert_eq!(env.products.count_by_model(env.model_id).await.unwrap(), 2);
    assert_eq!(
        env.products
            .count_by_dispatch_guide(Uuid::new_v4())
            .await
            .unwrap(),
        0
    );
}
