// src/api/payments.rs

use actix_web::{get, put, web, HttpResponse};
use serde_json::json;

use crate::api::auth::{AdminUser, AuthUser};
use crate::billing::{self, Decision};
use crate::db::{ADMIN_LISTING_LIMIT, OWN_HISTORY_LIMIT};
use crate::error::ApiError;
use crate::models::ApprovalStatus;
use crate::AppState;

#[utoipa::path(
    get,
    path = "/api/payments",
    tag = "payments",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Caller's payments, newest first (max 50)"),
        (status = 401, description = "Missing or invalid token")
    )
)]
#[get("/payments")]
pub async fn my_payments(
    state: web::Data<AppState>,
    caller: web::ReqData<AuthUser>,
) -> Result<HttpResponse, ApiError> {
    let payments = state
        .payments
        .list_owner_payments(caller.id, OWN_HISTORY_LIMIT)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "payments": payments })))
}

#[utoipa::path(
    get,
    path = "/api/payments/all",
    tag = "payments",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All payments, newest first (max 100)"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not an admin")
    )
)]
#[get("/payments/all")]
pub async fn all_payments(
    state: web::Data<AppState>,
    _admin: AdminUser,
) -> Result<HttpResponse, ApiError> {
    let payments = state
        .payments
        .list_payments(None, ADMIN_LISTING_LIMIT)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "payments": payments })))
}

#[utoipa::path(
    get,
    path = "/api/payments/pending",
    tag = "payments",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Payments awaiting a decision, newest first (max 100)"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not an admin")
    )
)]
#[get("/payments/pending")]
pub async fn pending_payments(
    state: web::Data<AppState>,
    _admin: AdminUser,
) -> Result<HttpResponse, ApiError> {
    let payments = state
        .payments
        .list_payments(Some(ApprovalStatus::Pending), ADMIN_LISTING_LIMIT)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "success": true, "payments": payments })))
}

async fn decide(
    state: &AppState,
    AdminUser(admin): AdminUser,
    raw_id: &str,
    decision: Decision,
) -> Result<HttpResponse, ApiError> {
    let not_found = || ApiError::NotFound("Payment not found".to_string());

    // Ids that cannot exist are reported like unknown ones.
    let payment_id: i32 = raw_id.parse().map_err(|_| not_found())?;

    let payment = billing::set_approval_status(state.payments.as_ref(), payment_id, decision)
        .await?
        .ok_or_else(not_found)?;

    log::info!(
        "admin id={} set payment id={} to {}",
        admin.id,
        payment.id,
        payment.approval_status
    );

    let message = match decision {
        Decision::Approve => "Payment approved successfully",
        Decision::Reject => "Payment rejected successfully",
    };

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": message,
        "payment": payment
    })))
}

#[utoipa::path(
    put,
    path = "/api/payments/{id}/approve",
    tag = "payments",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Payment id")),
    responses(
        (status = 200, description = "Payment approved"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Payment not found")
    )
)]
#[put("/payments/{id}/approve")]
pub async fn approve_payment(
    state: web::Data<AppState>,
    admin: AdminUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    decide(&state, admin, &path, Decision::Approve).await
}

#[utoipa::path(
    put,
    path = "/api/payments/{id}/reject",
    tag = "payments",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Payment id")),
    responses(
        (status = 200, description = "Payment rejected"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "Payment not found")
    )
)]
#[put("/payments/{id}/reject")]
pub async fn reject_payment(
    state: web::Data<AppState>,
    admin: AdminUser,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    decide(&state, admin, &path, Decision::Reject).await
}
