use actix_web::http::StatusCode;
use actix_web::test::{self, TestRequest};
use actix_web::App;
use rust_decimal_macros::dec;
use serde_json::{json, Value};

use voltpay::api;
use voltpay::models::{ApprovalStatus, PaymentStatus};
use voltpay::plans::PlanCatalog;

mod support;

fn paybill(body: Value) -> TestRequest {
    TestRequest::post().uri("/api/paybill").set_json(body)
}

#[actix_web::test]
async fn basic_plan_within_allowance_succeeds() {
    let (state, store) = support::memory_state(false);
    let app = test::init_service(App::new().app_data(state.clone()).configure(api::configure)).await;

    let req = paybill(json!({
        "consumerId": "CN-1001",
        "planName": "Basic Plan",
        "unitsUsed": 80
    }))
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["paymentStatus"], "success");
    assert_eq!(body["totalAmount"].as_f64(), Some(400.0));
    assert_eq!(body["remainingUnits"].as_f64(), Some(20.0));
    assert_eq!(body["message"], "Payment processed successfully");
    assert!(body["transactionDate"].is_string());

    let id = body["transactionId"].as_i64().expect("transaction id") as i32;
    let record = store.payment(id).await.expect("persisted");
    assert_eq!(record.consumer_id, "CN-1001");
    assert_eq!(record.amount_paid, dec!(400));
    assert_eq!(record.approval_status, ApprovalStatus::Pending);
    assert_eq!(record.owner_id, None);
}

#[actix_web::test]
async fn usage_over_allowance_is_a_persisted_failure() {
    let (state, store) = support::memory_state(false);
    let app = test::init_service(App::new().app_data(state.clone()).configure(api::configure)).await;

    let req = paybill(json!({
        "consumerId": "CN-1002",
        "planName": "Basic Plan",
        "unitsUsed": 120
    }))
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["paymentStatus"], "failure");
    assert_eq!(body["totalAmount"].as_f64(), Some(600.0));
    assert_eq!(body["remainingUnits"].as_f64(), Some(-20.0));
    assert_eq!(
        body["message"],
        "Insufficient units. Plan includes 100 units, but 120 units were used."
    );

    assert_eq!(store.payment_count().await, 1);
    let id = body["transactionId"].as_i64().unwrap() as i32;
    let record = store.payment(id).await.unwrap();
    assert_eq!(record.payment_status, PaymentStatus::Failure);
    assert_eq!(record.approval_status, ApprovalStatus::Pending);
}

#[actix_web::test]
async fn plan_name_match_ignores_case() {
    let (state, _) = support::memory_state(false);
    let app = test::init_service(App::new().app_data(state.clone()).configure(api::configure)).await;

    let mut totals = Vec::new();
    for name in ["Standard Plan", "sTaNdArD pLaN"] {
        let req = paybill(json!({
            "consumerId": "CN-7",
            "planName": name,
            "unitsUsed": 10.5
        }))
        .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["paymentStatus"], "success");
        totals.push((body["totalAmount"].clone(), body["remainingUnits"].clone()));
    }

    assert_eq!(totals[0], totals[1]);
    assert_eq!(totals[0].0.as_f64(), Some(47.25));
    assert_eq!(totals[0].1.as_f64(), Some(239.5));
}

#[actix_web::test]
async fn unknown_plan_is_not_found_and_not_persisted() {
    let (state, store) = support::memory_state(false);
    let app = test::init_service(App::new().app_data(state.clone()).configure(api::configure)).await;

    let req = paybill(json!({
        "consumerId": "CN-1",
        "planName": "Gold Plan",
        "unitsUsed": 10
    }))
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["paymentStatus"], "failure");
    assert_eq!(body["message"], "Plan \"Gold Plan\" not found");
    assert_eq!(store.payment_count().await, 0);
}

#[actix_web::test]
async fn invalid_input_is_rejected_without_persisting() {
    let (state, store) = support::memory_state(false);
    let app = test::init_service(App::new().app_data(state.clone()).configure(api::configure)).await;

    let cases = [
        (
            json!({ "planName": "Basic Plan", "unitsUsed": 10 }),
            "Missing required fields: consumerId, planName, and unitsUsed are required",
        ),
        (
            json!({ "consumerId": "CN-1", "planName": "Basic Plan" }),
            "Missing required fields: consumerId, planName, and unitsUsed are required",
        ),
        (
            json!({ "consumerId": "   ", "planName": "Basic Plan", "unitsUsed": 10 }),
            "Consumer ID cannot be empty",
        ),
        (
            json!({ "consumerId": "CN-1", "planName": "Basic Plan", "unitsUsed": -1 }),
            "Units used must be a positive number",
        ),
        (
            json!({ "consumerId": "CN-1", "planName": "Basic Plan", "unitsUsed": "80" }),
            "Units used must be a positive number",
        ),
        (
            json!({ "consumerId": "CN-1", "planName": "Basic Plan", "unitsUsed": null }),
            "Units used must be a positive number",
        ),
    ];

    for (body, message) in cases {
        let resp = test::call_service(&app, paybill(body).to_request()).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["paymentStatus"], "failure");
        assert_eq!(body["message"], message);
    }

    assert_eq!(store.payment_count().await, 0);
}

#[actix_web::test]
async fn units_beyond_decimal_range_are_refused() {
    let (state, store) = support::memory_state(false);
    let app = test::init_service(App::new().app_data(state.clone()).configure(api::configure)).await;

    for units in [json!(7.0e28), json!(1.0e30), json!(u64::MAX)] {
        let resp = test::call_service(
            &app,
            paybill(json!({ "consumerId": "C", "planName": "Basic Plan", "unitsUsed": units.clone() }))
                .to_request(),
        )
        .await;
        let status = resp.status();
        let body: Value = test::read_body_json(resp).await;

        if units == json!(u64::MAX) {
            // Large but representable: a persisted over-allowance failure.
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["paymentStatus"], "failure");
        } else {
            assert_eq!(status, StatusCode::BAD_REQUEST, "{units}");
            assert_eq!(body["message"], "Units used must be a positive number");
        }
    }

    assert_eq!(store.payment_count().await, 1);
}

#[actix_web::test]
async fn fractional_units_are_charged_exactly() {
    let (state, store) = support::memory_state(false);
    let app = test::init_service(App::new().app_data(state.clone()).configure(api::configure)).await;

    let req = paybill(json!({
        "consumerId": "CN-7",
        "planName": "Basic Plan",
        "unitsUsed": 10.1
    }))
    .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["totalAmount"].as_f64(), Some(50.5));
    assert_eq!(body["remainingUnits"].as_f64(), Some(89.9));

    let id = body["transactionId"].as_i64().unwrap() as i32;
    let record = store.payment(id).await.unwrap();
    assert_eq!(record.units_used, dec!(10.1));
    assert_eq!(record.amount_paid, dec!(50.5));
}

#[actix_web::test]
async fn malformed_body_gets_paybill_shaped_error() {
    let (state, store) = support::memory_state(false);
    let app = test::init_service(App::new().app_data(state.clone()).configure(api::configure)).await;

    let req = TestRequest::post()
        .uri("/api/paybill")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{\"consumerId\": ")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["paymentStatus"], "failure");
    assert_eq!(store.payment_count().await, 0);
}

#[actix_web::test]
async fn inactive_plan_is_refused() {
    let mut plans = PlanCatalog::default().plans().to_vec();
    plans[3].active = false;
    let catalog = PlanCatalog::new(plans).expect("catalog");
    let (state, store) = support::memory_state_with_catalog(catalog, false);
    let app = test::init_service(App::new().app_data(state.clone()).configure(api::configure)).await;

    let req = paybill(json!({
        "consumerId": "CN-1",
        "planName": "ultra plan",
        "unitsUsed": 10
    }))
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["message"], "Plan \"ultra plan\" is not active");
    assert_eq!(store.payment_count().await, 0);
}

#[actix_web::test]
async fn logged_in_caller_owns_the_payment() {
    let (state, _) = support::memory_state(false);
    let app = test::init_service(App::new().app_data(state.clone()).configure(api::configure)).await;

    let (token, user_id) = support::signup(&app, "Priya Nair", "priya@example.com", "user").await;

    let req = paybill(json!({
        "consumerId": "CN-55",
        "planName": "Premium Plan",
        "unitsUsed": 100
    }))
    .insert_header(support::bearer(&token))
    .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["paymentStatus"], "success");

    let anonymous = paybill(json!({
        "consumerId": "CN-56",
        "planName": "Premium Plan",
        "unitsUsed": 5
    }))
    .to_request();
    let _: Value = test::call_and_read_body_json(&app, anonymous).await;

    let req = TestRequest::get()
        .uri("/api/payments")
        .insert_header(support::bearer(&token))
        .to_request();
    let history: Value = test::call_and_read_body_json(&app, req).await;
    let payments = history["payments"].as_array().expect("payments array");
    assert_eq!(payments.len(), 1);
    assert_eq!(payments[0]["consumerId"], "CN-55");
    assert_eq!(payments[0]["ownerId"].as_i64(), Some(user_id));
}

#[actix_web::test]
async fn token_of_vanished_account_still_pays() {
    let (old_state, _) = support::memory_state(false);
    let old_app =
        test::init_service(App::new().app_data(old_state.clone()).configure(api::configure)).await;
    let (token, user_id) = support::signup(&old_app, "Gone User", "gone@example.com", "user").await;

    // Fresh store signed with the same secret, e.g. after a database reset.
    let (state, store) = support::memory_state(false);
    let app = test::init_service(App::new().app_data(state.clone()).configure(api::configure)).await;

    let req = paybill(json!({
        "consumerId": "CN-9",
        "planName": "Basic Plan",
        "unitsUsed": 10
    }))
    .insert_header(support::bearer(&token))
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    let id = body["transactionId"].as_i64().unwrap() as i32;
    assert_eq!(store.payment(id).await.unwrap().owner_id, Some(user_id as i32));
}

#[actix_web::test]
async fn bad_token_falls_back_to_anonymous() {
    let (state, store) = support::memory_state(false);
    let app = test::init_service(App::new().app_data(state.clone()).configure(api::configure)).await;

    let req = paybill(json!({
        "consumerId": "CN-9",
        "planName": "Basic Plan",
        "unitsUsed": 1
    }))
    .insert_header(support::bearer("not-a-jwt"))
    .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = test::read_body_json(resp).await;
    let id = body["transactionId"].as_i64().unwrap() as i32;
    assert_eq!(store.payment(id).await.unwrap().owner_id, None);
}

#[actix_web::test]
async fn plans_are_listed_in_catalog_order() {
    let (state, _) = support::memory_state(false);
    let app = test::init_service(App::new().app_data(state.clone()).configure(api::configure)).await;

    let req = TestRequest::get().uri("/api/plans").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    let names: Vec<&str> = body["plans"]
        .as_array()
        .expect("plans array")
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(
        names,
        vec!["Basic Plan", "Standard Plan", "Premium Plan", "Ultra Plan"]
    );
    assert_eq!(body["plans"][1]["pricePerUnit"].as_f64(), Some(4.5));
}
