//! Integration tests for the product lifecycle state machine using
//! in-memory SurrealDB.

use chrono::Utc;
use stockroom_core::ProductLifecycle;
use stockroom_core::error::StockroomError;
use stockroom_core::lifecycle::{AssignRequest, NewProduct, NewProductBatch, UnassignRequest};
use stockroom_core::models::assignment::AssignmentAction;
use stockroom_core::models::dispatch_guide::CreateDispatchGuide;
use stockroom_core::models::product::{ProductStatus, ProductType};
use stockroom_core::models::product_model::CreateProductModel;
use stockroom_core::repository::{
    AssignmentRepository, DispatchGuideRepository, ProductModelRepository, ProductRepository,
};
use stockroom_db::repository::{
    SurrealAssignmentRepository, SurrealDispatchGuideRepository, SurrealProductModelRepository,
    SurrealProductRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

type Lifecycle = ProductLifecycle<
    SurrealProductRepository<Db>,
    SurrealAssignmentRepository<Db>,
    SurrealDispatchGuideRepository<Db>,
    SurrealProductModelRepository<Db>,
>;

struct TestEnv {
    lifecycle: Lifecycle,
    products: SurrealProductRepository<Db>,
    assignments: SurrealAssignmentRepository<Db>,
    model_id: Uuid,
    guide_id: Uuid,
    actor: Uuid,
}

/// Spin up in-memory DB, run migrations, create a catalog model and a
/// dispatch guide for products to hang off.
async fn setup() -> TestEnv {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    stockroom_db::run_migrations(&db).await.unwrap();

    let models = SurrealProductModelRepository::new(db.clone());
    let model = models
        .create(CreateProductModel {
            name: "ThinkPad T14".into(),
            description: Some("14-inch business laptop".into()),
            part_number: "21HD-002".into(),
            created_by: None,
        })
        .await
        .unwrap();

    let guides = SurrealDispatchGuideRepository::new(db.clone());
    let guide = guides
        .create(CreateDispatchGuide {
            guide_number: "GD-1001".into(),
            vendor: "Acme Computing".into(),
            dispatch_date: Utc::now(),
            file_name: "gd-1001.pdf".into(),
            stored_file_name: "stored-gd-1001.pdf".into(),
            file_size: Some(1024),
            mime_type: Some("application/pdf".into()),
            uploaded_by: Uuid::new_v4(),
        })
        .await
        .unwrap();

    let products = SurrealProductRepository::new(db.clone());
    let assignments = SurrealAssignmentRepository::new(db.clone());

    let lifecycle = ProductLifecycle::new(
        products.clone(),
        assignments.clone(),
        guides,
        models,
    );

    TestEnv {
        lifecycle,
        products,
        assignments,
        model_id: model.id,
        guide_id: guide.id,
        actor: Uuid::new_v4(),
    }
}

fn new_product(env: &TestEnv, serial: &str) -> NewProduct {
    NewProduct {
        product_model_id: env.model_id,
        product_type: ProductType::Purchased,
        is_serialized: true,
        serial_number: Some(serial.into()),
        quantity: 1,
        inventory_number: None,
        rental_id: None,
        dispatch_guide_id: env.guide_id,
    }
}

fn assign_request(name: &str, email: &str, location: &str) -> AssignRequest {
    AssignRequest {
        assigned_to: name.into(),
        assigned_email: Some(email.into()),
        assigned_ad_account: None,
        location: location.into(),
        assignment_date: None,
        notes: None,
    }
}

// -- creation ---------------------------------------------------------------

#[tokio::test]
async fn create_denormalizes_model_fields() {
    let env = setup().await;
    let product = env
        .lifecycle
        .create(new_product(&env, "SN-100"), env.actor)
        .await
        .unwrap();

    assert_eq!(product.name, "ThinkPad T14");
    assert_eq!(product.part_number, "21HD-002");
    assert_eq!(product.status, ProductStatus::Available);
    assert_eq!(product.serial_number.as_deref(), Some("SN-100"));
    assert!(product.current_assignment.is_none());
    assert!(product.is_consistent());
}

#[tokio::test]
async fn duplicate_serial_is_a_conflict() {
    let env = setup().await;
    env.lifecycle
        .create(new_product(&env, "SN-DUP"), env.actor)
        .await
        .unwrap();

    let result = env
        .lifecycle
        .create(new_product(&env, "SN-DUP"), env.actor)
        .await;
    assert!(matches!(result, Err(StockroomError::Conflict { .. })));
}

#[tokio::test]
async fn rental_requires_rental_id() {
    let env = setup().await;
    let mut input = new_product(&env, "SN-R1");
    input.product_type = ProductType::Rental;

    let result = env.lifecycle.create(input.clone(), env.actor).await;
    assert!(matches!(result, Err(StockroomError::Validation { .. })));

    input.rental_id = Some("RENT-77".into());
    let product = env.lifecycle.create(input, env.actor).await.unwrap();
    assert_eq!(product.rental_id.as_deref(), Some("RENT-77"));
}

#[tokio::test]
async fn serialized_creation_requires_serial() {
    let env = setup().await;
    let mut input = new_product(&env, "ignored");
    input.serial_number = None;

    let result = env.lifecycle.create(input, env.actor).await;
    assert!(matches!(result, Err(StockroomError::Validation { .. })));
}

#[tokio::test]
async fn quantity_tracked_stock_has_no_serial() {
    let env = setup().await;
    let mut input = new_product(&env, "ignored");
    input.is_serialized = false;
    input.serial_number = None;
    input.quantity = 12;

    let product = env.lifecycle.create(input, env.actor).await.unwrap();
    assert!(!product.is_serialized);
    assert_eq!(product.quantity, 12);
    assert!(product.serial_number.is_none());

    // Multiple serial-less products may coexist (sparse uniqueness).
    let mut second = new_product(&env, "ignored");
    second.is_serialized = false;
    second.serial_number = None;
    second.quantity = 3;
    env.lifecycle.create(second, env.actor).await.unwrap();
}

#[tokio::test]
async fn unknown_guide_is_not_found() {
    let env = setup().await;
    let mut input = new_product(&env, "SN-X");
    input.dispatch_guide_id = Uuid::new_v4();

    let result = env.lifecycle.create(input, env.actor).await;
    assert!(matches!(result, Err(StockroomError::NotFound { .. })));
}

// -- bulk creation ----------------------------------------------------------

#[tokio::test]
async fn bulk_create_inserts_all_rows() {
    let env = setup().await;
    let products = env
        .lifecycle
        .create_bulk(
            NewProductBatch {
                product_model_id: env.model_id,
                product_type: ProductType::Purchased,
                serial_numbers: vec!["B1".into(), " B2 ".into(), "B3".into()],
                rental_id: None,
                dispatch_guide_id: env.guide_id,
            },
            env.actor,
        )
        .await
        .unwrap();

    assert_eq!(products.len(), 3);
    let serials: Vec<_> = products
        .iter()
        .map(|p| p.serial_number.as_deref().unwrap())
        .collect();
    assert_eq!(serials, vec!["B1", "B2", "B3"]);
    assert!(products.iter().all(|p| p.status == ProductStatus::Available));
}

#[tokio::test]
async fn bulk_create_rejects_intra_batch_duplicates() {
    let env = setup().await;
    let result = env
        .lifecycle
        .create_bulk(
            NewProductBatch {
                product_model_id: env.model_id,
                product_type: ProductType::Purchased,
                serial_numbers: vec!["A1".into(), "A2".into(), "A1".into()],
                rental_id: None,
                dispatch_guide_id: env.guide_id,
            },
            env.actor,
        )
        .await;

    match result {
        Err(StockroomError::Validation { message }) => {
            assert!(message.contains("A1"), "message should name the duplicate");
            assert!(!message.contains("A2"));
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    // Zero rows inserted.
    let all = env
        .products
        .list(Default::default())
        .await
        .unwrap();
    assert!(all.is_empty());
}

#[tokio::test]
async fn bulk_create_rejects_serials_already_in_store() {
    let env = setup().await;
    env.lifecycle
        .create(new_product(&env, "TAKEN-1"), env.actor)
        .await
        .unwrap();

    let result = env
        .lifecycle
        .create_bulk(
            NewProductBatch {
                product_model_id: env.model_id,
                product_type: ProductType::Purchased,
                serial_numbers: vec!["FRESH-1".into(), "TAKEN-1".into()],
                rental_id: None,
                dispatch_guide_id: env.guide_id,
            },
            env.actor,
        )
        .await;

    match result {
        Err(StockroomError::Conflict { message }) => {
            assert!(message.contains("TAKEN-1"));
        }
        other => panic!("expected conflict, got {other:?}"),
    }

    // The batch was rejected wholesale: only the original row exists.
    let all = env.products.list(Default::default()).await.unwrap();
    assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn bulk_create_rejects_empty_serial_set() {
    let env = setup().await;
    let result = env
        .lifecycle
        .create_bulk(
            NewProductBatch {
                product_model_id: env.model_id,
                product_type: ProductType::Purchased,
                serial_numbers: vec!["  ".into(), "".into()],
                rental_id: None,
                dispatch_guide_id: env.guide_id,
            },
            env.actor,
        )
        .await;
    assert!(matches!(result, Err(StockroomError::Validation { .. })));
}

// -- assign / unassign ------------------------------------------------------

#[tokio::test]
async fn assign_sets_snapshot_and_history() {
    let env = setup().await;
    let product = env
        .lifecycle
        .create(new_product(&env, "SN-A1"), env.actor)
        .await
        .unwrap();

    let outcome = env
        .lifecycle
        .assign(
            product.id,
            assign_request("Juan Soto", "juan@empresa.cl", "Santiago"),
            env.actor,
        )
        .await
        .unwrap();

    assert_eq!(outcome.product.status, ProductStatus::Assigned);
    let snapshot = outcome.product.current_assignment.as_ref().unwrap();
    assert_eq!(snapshot.assigned_to, "Juan Soto");
    assert_eq!(snapshot.location, "Santiago");
    assert!(outcome.product.is_consistent());

    assert_eq!(outcome.assignment.action, AssignmentAction::Assign);
    assert_eq!(outcome.assignment.performed_by, env.actor);

    let history = env.lifecycle.history(product.id).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn assign_requires_contact_and_location() {
    let env = setup().await;
    let product = env
        .lifecycle
        .create(new_product(&env, "SN-A2"), env.actor)
        .await
        .unwrap();

    // Whitespace-only name.
    let mut request = assign_request("   ", "x@x.cl", "HQ");
    let result = env.lifecycle.assign(product.id, request, env.actor).await;
    assert!(matches!(result, Err(StockroomError::Validation { .. })));

    // No contact at all.
    request = assign_request("Ana", "x@x.cl", "HQ");
    request.assigned_email = None;
    let result = env.lifecycle.assign(product.id, request, env.actor).await;
    assert!(matches!(result, Err(StockroomError::Validation { .. })));

    // Directory account alone is an acceptable contact.
    request = assign_request("Ana", "unused", "HQ");
    request.assigned_email = None;
    request.assigned_ad_account = Some("arojas".into());
    let outcome = env
        .lifecycle
        .assign(product.id, request, env.actor)
        .await
        .unwrap();
    assert_eq!(
        outcome
            .product
            .current_assignment
            .unwrap()
            .assigned_ad_account
            .as_deref(),
        Some("arojas")
    );
}

#[tokio::test]
async fn assign_twice_fails_without_release() {
    let env = setup().await;
    let product = env
        .lifecycle
        .create(new_product(&env, "SN-A3"), env.actor)
        .await
        .unwrap();

    env.lifecycle
        .assign(
            product.id,
            assign_request("Ana", "ana@x.cl", "HQ"),
            env.actor,
        )
        .await
        .unwrap();

    let result = env
        .lifecycle
        .assign(
            product.id,
            assign_request("Pedro", "pedro@x.cl", "HQ"),
            env.actor,
        )
        .await;
    assert!(matches!(result, Err(StockroomError::PreconditionFailed { .. })));

    // The failed attempt left no history record behind.
    let history = env.lifecycle.history(product.id).await.unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn unassign_without_assignment_fails() {
    let env = setup().await;
    let product = env
        .lifecycle
        .create(new_product(&env, "SN-U1"), env.actor)
        .await
        .unwrap();

    let result = env
        .lifecycle
        .unassign(product.id, UnassignRequest::default(), env.actor)
        .await;
    assert!(matches!(result, Err(StockroomError::PreconditionFailed { .. })));
}

#[tokio::test]
async fn assign_unassign_round_trip() {
    let env = setup().await;
    let product = env
        .lifecycle
        .create(new_product(&env, "SN-RT"), env.actor)
        .await
        .unwrap();

    env.lifecycle
        .assign(
            product.id,
            assign_request("Ana", "ana@x.cl", "HQ"),
            env.actor,
        )
        .await
        .unwrap();

    let outcome = env
        .lifecycle
        .unassign(product.id, UnassignRequest::default(), env.actor)
        .await
        .unwrap();

    assert_eq!(outcome.product.status, ProductStatus::Available);
    assert!(outcome.product.current_assignment.is_none());

    // The release copied the holder identity from the snapshot.
    assert_eq!(outcome.assignment.action, AssignmentAction::Unassign);
    assert_eq!(outcome.assignment.assigned_to, "Ana");
    assert_eq!(outcome.assignment.location, "HQ");

    // Exactly two records, most recent (UNASSIGN) first.
    let history = env.lifecycle.history(product.id).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].action, AssignmentAction::Unassign);
    assert_eq!(history[1].action, AssignmentAction::Assign);
}

#[tokio::test]
async fn unassign_location_override() {
    let env = setup().await;
    let product = env
        .lifecycle
        .create(new_product(&env, "SN-U2"), env.actor)
        .await
        .unwrap();

    env.lifecycle
        .assign(
            product.id,
            assign_request("Ana", "ana@x.cl", "HQ"),
            env.actor,
        )
        .await
        .unwrap();

    let outcome = env
        .lifecycle
        .unassign(
            product.id,
            UnassignRequest {
                location: Some("Bodega Central".into()),
                assignment_date: None,
                notes: Some("returned damaged".into()),
            },
            env.actor,
        )
        .await
        .unwrap();

    assert_eq!(outcome.assignment.location, "Bodega Central");
    assert_eq!(outcome.assignment.notes.as_deref(), Some("returned damaged"));
}

#[tokio::test]
async fn quantity_tracked_stock_cannot_be_assigned() {
    let env = setup().await;
    let mut input = new_product(&env, "ignored");
    input.is_serialized = false;
    input.serial_number = None;
    input.quantity = 5;
    let product = env.lifecycle.create(input, env.actor).await.unwrap();

    let result = env
        .lifecycle
        .assign(
            product.id,
            assign_request("Ana", "ana@x.cl", "HQ"),
            env.actor,
        )
        .await;
    assert!(matches!(result, Err(StockroomError::PreconditionFailed { .. })));
}

// -- decommission -----------------------------------------------------------

#[tokio::test]
async fn full_lifecycle_scenario() {
    let env = setup().await;

    // create -> assign
    let product = env
        .lifecycle
        .create(new_product(&env, "SN-100-SCENARIO"), env.actor)
        .await
        .unwrap();
    assert_eq!(product.status, ProductStatus::Available);

    let outcome = env
        .lifecycle
        .assign(
            product.id,
            assign_request("Juan", "juan@x.cl", "Santiago"),
            env.actor,
        )
        .await
        .unwrap();
    assert_eq!(outcome.product.status, ProductStatus::Assigned);
    assert_eq!(env.lifecycle.history(product.id).await.unwrap().len(), 1);

    // decommission while assigned -> rejected
    let result = env
        .lifecycle
        .decommission(product.id, "broken", env.actor)
        .await;
    assert!(matches!(result, Err(StockroomError::PreconditionFailed { .. })));

    // unassign -> decommission succeeds
    env.lifecycle
        .unassign(product.id, UnassignRequest::default(), env.actor)
        .await
        .unwrap();

    let retired = env
        .lifecycle
        .decommission(product.id, "broken", env.actor)
        .await
        .unwrap();
    assert_eq!(retired.status, ProductStatus::Decommissioned);
    assert_eq!(retired.decommission_reason.as_deref(), Some("broken"));
    assert_eq!(retired.decommissioned_by, Some(env.actor));
    assert!(retired.decommissioned_at.is_some());
    assert!(retired.current_assignment.is_none());
    assert!(retired.is_consistent());
}

#[tokio::test]
async fn decommission_requires_nonempty_reason() {
    let env = setup().await;
    let product = env
        .lifecycle
        .create(new_product(&env, "SN-D1"), env.actor)
        .await
        .unwrap();

    let result = env.lifecycle.decommission(product.id, "   ", env.actor).await;
    assert!(matches!(result, Err(StockroomError::Validation { .. })));

    // No write happened.
    let fetched = env.lifecycle.get(product.id).await.unwrap();
    assert_eq!(fetched.status, ProductStatus::Available);
}

#[tokio::test]
async fn decommission_reason_is_trimmed() {
    let env = setup().await;
    let product = env
        .lifecycle
        .create(new_product(&env, "SN-D2"), env.actor)
        .await
        .unwrap();

    let retired = env
        .lifecycle
        .decommission(product.id, "  water damage  ", env.actor)
        .await
        .unwrap();
    assert_eq!(retired.decommission_reason.as_deref(), Some("water damage"));
}

#[tokio::test]
async fn decommissioned_is_terminal() {
    let env = setup().await;
    let product = env
        .lifecycle
        .create(new_product(&env, "SN-T1"), env.actor)
        .await
        .unwrap();
    env.lifecycle
        .decommission(product.id, "obsolete", env.actor)
        .await
        .unwrap();

    // assign fails
    let result = env
        .lifecycle
        .assign(
            product.id,
            assign_request("Ana", "ana@x.cl", "HQ"),
            env.actor,
        )
        .await;
    assert!(matches!(result, Err(StockroomError::PreconditionFailed { .. })));

    // unassign fails
    let result = env
        .lifecycle
        .unassign(product.id, UnassignRequest::default(), env.actor)
        .await;
    assert!(matches!(result, Err(StockroomError::PreconditionFailed { .. })));

    // decommission again fails
    let result = env
        .lifecycle
        .decommission(product.id, "again", env.actor)
        .await;
    assert!(matches!(result, Err(StockroomError::PreconditionFailed { .. })));

    // and no history record leaked from the failed attempts
    assert!(env.lifecycle.history(product.id).await.unwrap().is_empty());
}

// -- delete -----------------------------------------------------------------

#[tokio::test]
async fn delete_assigned_product_fails() {
    let env = setup().await;
    let product = env
        .lifecycle
        .create(new_product(&env, "SN-DEL1"), env.actor)
        .await
        .unwrap();
    env.lifecycle
        .assign(
            product.id,
            assign_request("Ana", "ana@x.cl", "HQ"),
            env.actor,
        )
        .await
        .unwrap();

    let result = env.lifecycle.delete(product.id).await;
    assert!(matches!(result, Err(StockroomError::PreconditionFailed { .. })));
}

#[tokio::test]
async fn delete_cascades_history() {
    let env = setup().await;
    let product = env
        .lifecycle
        .create(new_product(&env, "SN-DEL2"), env.actor)
        .await
        .unwrap();
    env.lifecycle
        .assign(
            product.id,
            assign_request("Ana", "ana@x.cl", "HQ"),
            env.actor,
        )
        .await
        .unwrap();
    env.lifecycle
        .unassign(product.id, UnassignRequest::default(), env.actor)
        .await
        .unwrap();

    env.lifecycle.delete(product.id).await.unwrap();

    let fetched = env.lifecycle.get(product.id).await;
    assert!(matches!(fetched, Err(StockroomError::NotFound { .. })));

    // The assignment log went with the product.
    let orphaned = env
        .assignments
        .list_by_product(product.id)
        .await
        .unwrap();
    assert!(orphaned.is_empty());
}

#[tokio::test]
async fn delete_decommissioned_product_succeeds() {
    let env = setup().await;
    let product = env
        .lifecycle
        .create(new_product(&env, "SN-DEL3"), env.actor)
        .await
        .unwrap();
    env.lifecycle
        .decommission(product.id, "scrapped", env.actor)
        .await
        .unwrap();

    env.lifecycle.delete(product.id).await.unwrap();
    assert!(matches!(
        env.lifecycle.get(product.id).await,
        Err(StockroomError::NotFound { .. })
    ));
}

// -- snapshot rebuild -------------------------------------------------------

#[tokio::test]
async fn rebuild_snapshot_restores_from_latest_record() {
    let env = setup().await;
    let product = env
        .lifecycle
        .create(new_product(&env, "SN-RB1"), env.actor)
        .await
        .unwrap();
    env.lifecycle
        .assign(
            product.id,
            assign_request("Ana", "ana@x.cl", "HQ"),
            env.actor,
        )
        .await
        .unwrap();

    // Manually corrupt the denormalized state, as a bad data fix would.
    env.products
        .restore_snapshot(product.id, ProductStatus::Available, None)
        .await
        .unwrap();
    let broken = env.lifecycle.get(product.id).await.unwrap();
    assert!(broken.current_assignment.is_none());

    // The log is the source of truth; rebuild recovers the snapshot.
    let repaired = env.lifecycle.rebuild_snapshot(product.id).await.unwrap();
    assert_eq!(repaired.status, ProductStatus::Assigned);
    let snapshot = repaired.current_assignment.unwrap();
    assert_eq!(snapshot.assigned_to, "Ana");
    assert_eq!(snapshot.location, "HQ");
}

#[tokio::test]
async fn rebuild_snapshot_clears_after_unassign_record() {
    let env = setup().await;
    let product = env
        .lifecycle
        .create(new_product(&env, "SN-RB2"), env.actor)
        .await
        .unwrap();
    env.lifecycle
        .assign(
            product.id,
            assign_request("Ana", "ana@x.cl", "HQ"),
            env.actor,
        )
        .await
        .unwrap();
    env.lifecycle
        .unassign(product.id, UnassignRequest::default(), env.actor)
        .await
        .unwrap();

    let repaired = env.lifecycle.rebuild_snapshot(product.id).await.unwrap();
    assert_eq!(repaired.status, ProductStatus::Available);
    assert!(repaired.current_assignment.is_none());
}
