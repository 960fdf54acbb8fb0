//! Integration tests for dispatch guides and product models:
//! natural-key uniqueness and referential delete guards.

use chrono::Utc;
use stockroom_core::error::StockroomError;
use stockroom_core::models::dispatch_guide::CreateDispatchGuide;
use stockroom_core::models::external_act::CreateExternalDecommissionAct;
use stockroom_core::models::product::CreateProduct;
use stockroom_core::models::product::ProductType;
use stockroom_core::models::product_model::CreateProductModel;
use stockroom_core::repository::{
    DispatchGuideRepository, ExternalActRepository, ProductModelRepository, ProductRepository,
};
use stockroom_db::repository::{
    SurrealDispatchGuideRepository, SurrealExternalActRepository, SurrealProductModelRepository,
    SurrealProductRepository,
};
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;

async fn setup() -> Surreal<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    stockroom_db::run_migrations(&db).await.unwrap();
    db
}

fn guide_input(number: &str) -> CreateDispatchGuide {
    CreateDispatchGuide {
        guide_number: number.into(),
        vendor: "Acme".into(),
        dispatch_date: Utc::now(),
        file_name: format!("{number}.pdf"),
        stored_file_name: format!("stored-{number}.pdf"),
        file_size: Some(2048),
        mime_type: Some("application/pdf".into()),
        uploaded_by: Uuid::new_v4(),
    }
}

#[tokio::test]
async fn guide_numbers_are_unique() {
    let db = setup().await;
    let guides = SurrealDispatchGuideRepository::new(db);

    guides.create(guide_input("GD-1")).await.unwrap();
    let result = guides.create(guide_input("GD-1")).await;
    assert!(matches!(result, Err(StockroomError::Conflict { .. })));
}

#[tokio::test]
async fn guide_lookup_by_number() {
    let db = setup().await;
    let guides = SurrealDispatchGuideRepository::new(db);

    let created = guides.create(guide_input("GD-2")).await.unwrap();
    let found = guides.get_by_number("GD-2").await.unwrap().unwrap();
    assert_eq!(found.id, created.id);
    assert!(guides.get_by_number("GD-missing").await.unwrap().is_none());
}

#[tokio::test]
async fn guide_list_is_newest_first() {
    let db = setup().await;
    let guides = SurrealDispatchGuideRepository::new(db);

    guides.create(guide_input("GD-A")).await.unwrap();
    guides.create(guide_input("GD-B")).await.unwrap();

    let listed = guides.list().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].guide_number, "GD-B");
}

#[tokio::test]
async fn guide_delete_blocked_while_referenced() {
    let db = setup().await;
    let guides = SurrealDispatchGuideRepository::new(db.clone());
    let models = SurrealProductModelRepository::new(db.clone());
    let products = SurrealProductRepository::new(db);

    let guide = guides.create(guide_input("GD-3")).await.unwrap();
    let model = models
        .create(CreateProductModel {
            name: "Monitor".into(),
            description: None,
            part_number: "MN-24".into(),
            created_by: None,
        })
        .await
        .unwrap();

    let product = products
        .create(CreateProduct {
            product_model_id: model.id,
            name: "Monitor".into(),
            description: None,
            product_type: ProductType::Purchased,
            is_serialized: true,
            serial_number: Some("MN-0001".into()),
            quantity: 1,
            part_number: "MN-24".into(),
            inventory_number: None,
            rental_id: None,
            dispatch_guide_id: guide.id,
            created_by: None,
        })
        .await
        .unwrap();

    // Guarded while referenced.
    let result = guides.delete(guide.id).await;
    assert!(matches!(result, Err(StockroomError::PreconditionFailed { .. })));

    // Model deletion is equally guarded.
    let result = models.delete(model.id).await;
    assert!(matches!(result, Err(StockroomError::PreconditionFailed { .. })));

    // Once the product is gone both can be removed.
    products.delete(product.id).await.unwrap();
    guides.delete(guide.id).await.unwrap();
    models.delete(model.id).await.unwrap();

    assert!(matches!(
        guides.get_by_id(guide.id).await,
        Err(StockroomError::NotFound { .. })
    ));
}

#[tokio::test]
async fn model_part_numbers_are_unique() {
    let db = setup().await;
    let models = SurrealProductModelRepository::new(db);

    models
        .create(CreateProductModel {
            name: "Keyboard".into(),
            description: Some("Mechanical".into()),
            part_number: "KB-10".into(),
            created_by: None,
        })
        .await
        .unwrap();

    let result = models
        .create(CreateProductModel {
            name: "Other Keyboard".into(),
            description: None,
            part_number: "KB-10".into(),
            created_by: None,
        })
        .await;
    assert!(matches!(result, Err(StockroomError::Conflict { .. })));
}

#[tokio::test]
async fn model_list_sorted_by_name_then_part() {
    let db = setup().await;
    let models = SurrealProductModelRepository::new(db);

    for (name, part) in [("Zebra", "Z-1"), ("Alpha", "A-2"), ("Alpha", "A-1")] {
        models
            .create(CreateProductModel {
                name: name.into(),
                description: None,
                part_number: part.into(),
                created_by: None,
            })
            .await
            .unwrap();
    }

    let listed = models.list().await.unwrap();
    let keys: Vec<_> = listed
        .iter()
        .map(|m| (m.name.as_str(), m.part_number.as_str()))
        .collect();
    assert_eq!(keys, vec![("Alpha", "A-1"), ("Alpha", "A-2"), ("Zebra", "Z-1")]);
}

#[tokio::test]
async fn external_acts_listed_by_record_date_desc() {
    let db = setup().await;
    let acts = SurrealExternalActRepository::new(db);

    let older = CreateExternalDecommissionAct {
        inventory_manager: "M. Soto".into(),
        product_name: "Old Printer".into(),
        serial_number: Some("PR-9".into()),
        operational_unit: "Logistics".into(),
        record_date: Utc::now() - chrono::Duration::days(30),
        file_name: "act-old.pdf".into(),
        stored_file_name: "stored-act-old.pdf".into(),
        file_size: None,
        mime_type: None,
        uploaded_by: Uuid::new_v4(),
    };
    let newer = CreateExternalDecommissionAct {
        record_date: Utc::now(),
        product_name: "Old Scanner".into(),
        file_name: "act-new.pdf".into(),
        stored_file_name: "stored-act-new.pdf".into(),
        ..older.clone()
    };

    acts.create(older).await.unwrap();
    let created_newer = acts.create(newer).await.unwrap();

    let listed = acts.list().await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, created_newer.id);
    assert_eq!(listed[0].product_name, "Old Scanner");

    let fetched = acts.get_by_id(created_newer.id).await.unwrap();
    assert_eq!(fetched.inventory_manager, "M. Soto");
}
