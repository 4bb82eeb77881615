mod common;

use agridirect_api::entities::{consumer, farmer, order};
use axum::http::{Method, StatusCode};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{EntityTrait, PaginatorTrait};
use serde_json::json;
use std::str::FromStr;
use uuid::Uuid;

use common::{json_body, new_product, MultipartBody, TestApp, PNG_BYTES};

fn decimal(value: &serde_json::Value) -> Decimal {
    Decimal::from_str(value.as_str().expect("decimal serialized as string")).unwrap()
}

#[tokio::test]
async fn farmer_registers_over_multipart_and_logs_in() {
    let app = TestApp::new().await;

    let response = app
        .multipart(
            Method::POST,
            "/api/v1/farmers/register",
            MultipartBody::new()
                .text("name", "Asha Patil")
                .text("farmName", "Green Acres")
                .text("location", "Nashik")
                .text("mobile", "9000000000")
                .text("experience", "12")
                .text("email", "Asha@Example.com")
                .text("password", "harvest-2024")
                .file("qrCode", "upi.png", "image/png", PNG_BYTES),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let profile = json_body(response).await;
    assert_eq!(profile["farm_name"], "Green Acres");
    assert!(profile.get("password_hash").is_none());
    let farmer_id = profile["id"].as_str().unwrap().to_string();

    let response = app
        .request(
            Method::POST,
            "/api/v1/farmers/login",
            Some(json!({"email": "asha@example.com", "password": "harvest-2024"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let session = json_body(response).await;
    assert_eq!(session["farmer_id"], farmer_id);
    assert_eq!(session["farmer_name"], "Asha Patil");

    let response = app
        .request(
            Method::POST,
            "/api/v1/farmers/login",
            Some(json!({"email": "asha@example.com", "password": "wrong-one"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .request(Method::GET, &format!("/api/v1/farmers/{}/qr", farmer_id), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let qr = json_body(response).await;
    assert!(qr["qr_code"].as_str().unwrap().ends_with("-upi.png"));
}

#[tokio::test]
async fn farmer_without_uploaded_qr_is_not_found() {
    let app = TestApp::new().await;
    let farmer = app.seed_farmer("asha@example.com").await;

    let response = app
        .request(Method::GET, &format!("/api/v1/farmers/{}/qr", farmer.id), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_farmer_email_conflicts_without_writing() {
    let app = TestApp::new().await;
    app.seed_farmer("asha@example.com").await;

    let response = app
        .multipart(
            Method::POST,
            "/api/v1/farmers/register",
            MultipartBody::new()
                .text("name", "Someone Else")
                .text("farm_name", "Other Farm")
                .text("location", "Pune")
                .text("mobile", "9222222222")
                .text("experience", "3")
                .text("email", "ASHA@example.com")
                .text("password", "another-pass"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let count = farmer::Entity::find().count(&*app.state.db).await.unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn consumer_registration_check_and_login() {
    let app = TestApp::new().await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/consumers/check-email",
            Some(json!({"email": "ravi@example.com"})),
        )
        .await;
    assert_eq!(json_body(response).await["exists"], false);

    let payload = json!({
        "name": "Ravi Kumar",
        "email": "ravi@example.com",
        "mobile": "9111111111",
        "password": "basket-99"
    });
    let response = app
        .request(Method::POST, "/api/v1/consumers/register", Some(payload.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .request(Method::POST, "/api/v1/consumers/register", Some(payload))
        .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let count = consumer::Entity::find().count(&*app.state.db).await.unwrap();
    assert_eq!(count, 1);

    let response = app
        .request(
            Method::POST,
            "/api/v1/consumers/check-email",
            Some(json!({"email": "RAVI@example.com"})),
        )
        .await;
    assert_eq!(json_body(response).await["exists"], true);

    let response = app
        .request(
            Method::POST,
            "/api/v1/consumers/login",
            Some(json!({"name": "Ravi Kumar", "email": "ravi@example.com", "password": "basket-99"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["name"], "Ravi Kumar");

    let response = app
        .request(
            Method::POST,
            "/api/v1/consumers/login",
            Some(json!({"name": "Someone", "email": "ravi@example.com", "password": "basket-99"})),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn order_snapshot_survives_price_change_and_deletion() {
    let app = TestApp::new().await;
    let farmer = app.seed_farmer("asha@example.com").await;
    let consumer = app.seed_consumer("ravi@example.com").await;
    let created = app
        .seed_product(farmer.id, new_product("Basmati Rice", dec!(80)))
        .await;
    let product_id = created.product.id;

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "product_id": product_id,
                "farmer_id": farmer.id,
                "consumer_id": consumer.id,
                "quantity": "3",
                "address": "12 Market Road, Pune",
                "payment_method": "cod"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let placed = json_body(response).await;
    assert_eq!(placed["product_name"], "Basmati Rice");
    assert_eq!(placed["consumer_email"], "ravi@example.com");
    assert_eq!(decimal(&placed["unit_price"]), dec!(80));
    assert_eq!(decimal(&placed["total_price"]), dec!(240));

    app.multipart(
        Method::PUT,
        &format!("/api/v1/products/{}", product_id),
        MultipartBody::new().text("price", "95"),
    )
    .await;
    app.request(Method::DELETE, &format!("/api/v1/products/{}", product_id), None)
        .await;

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/orders?consumer_id={}", consumer.id),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let orders = json_body(response).await;
    let orders = orders.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(decimal(&orders[0]["unit_price"]), dec!(80));
    assert_eq!(orders[0]["product_name"], "Basmati Rice");

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/farmers/{}/orders", farmer.id),
            None,
        )
        .await;
    assert_eq!(json_body(response).await.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn order_for_vanished_product_uses_request_values() {
    let app = TestApp::new().await;
    let consumer = app.seed_consumer("ravi@example.com").await;
    let farmer_id = Uuid::now_v7();

    let placed = app
        .state
        .services
        .orders
        .place_order(agridirect_api::services::orders::PlaceOrder {
            product_id: Uuid::now_v7(),
            farmer_id,
            consumer_id: consumer.id,
            product_name: Some("Old Stock Jaggery".to_string()),
            unit_price: Some(dec!(45)),
            quantity: dec!(2),
            total_price: None,
            address: "12 Market Road, Pune".to_string(),
            payment_method: "upi".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(placed.product_name, "Old Stock Jaggery");
    assert_eq!(placed.farmer_id, farmer_id);
    assert_eq!(placed.total_price, dec!(90));
}

#[tokio::test]
async fn order_rejects_unknown_consumer() {
    let app = TestApp::new().await;
    let farmer = app.seed_farmer("asha@example.com").await;
    let created = app
        .seed_product(farmer.id, new_product("Wheat", dec!(30)))
        .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/orders",
            Some(json!({
                "product_id": created.product.id,
                "farmer_id": farmer.id,
                "consumer_id": Uuid::now_v7(),
                "quantity": "1",
                "address": "12 Market Road, Pune",
                "payment_method": "cod"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_body(response).await["message"],
        "Validation error: Invalid consumer"
    );
    let count = order::Entity::find().count(&*app.state.db).await.unwrap();
    assert_eq!(count, 0);
}

#[tokio::test]
async fn order_listing_requires_consumer_id() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/api/v1/orders", None).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(Method::GET, "/api/v1/orders?consumer_id=nope", None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_endpoints_report_database_readiness() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "up");

    let response = app.request(Method::GET, "/health/ready", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["ready"], true);
}
