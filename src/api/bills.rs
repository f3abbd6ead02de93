// src/api/bills.rs

use actix_web::{get, post, web, HttpResponse};
use serde_json::json;

use crate::api::auth::Identity;
use crate::billing::{BillError, BillRequest, PaymentOutcome};
use crate::AppState;

/// Charges the submitted usage against a plan. Login is optional: a valid
/// bearer token attaches the payment to the caller's account.
#[utoipa::path(
    post,
    path = "/api/paybill",
    tag = "bills",
    request_body = BillRequest,
    responses(
        (status = 200, description = "Bill processed; paymentStatus tells success or failure", body = PaymentOutcome),
        (status = 400, description = "Missing or invalid fields, or inactive plan"),
        (status = 404, description = "Plan not found"),
        (status = 500, description = "Storage error")
    )
)]
#[post("/api/paybill")]
pub async fn pay_bill(
    state: web::Data<AppState>,
    identity: Identity,
    payload: web::Json<BillRequest>,
) -> Result<HttpResponse, BillError> {
    let outcome = state
        .bills
        .process_payment(&payload, identity.user_id)
        .await?;

    Ok(HttpResponse::Ok().json(outcome))
}

#[utoipa::path(
    get,
    path = "/api/plans",
    tag = "bills",
    responses((status = 200, description = "Plan catalog in display order"))
)]
#[get("/api/plans")]
pub async fn list_plans(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "success": true,
        "plans": state.bills.catalog().plans()
    }))
}
