// src/api/mod.rs

use actix_cors::Cors;
use actix_web::error::JsonPayloadError;
use actix_web::{get, web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde_json::json;

use crate::models::PaymentStatus;

pub mod auth;
pub mod bills;
pub mod payments;

#[utoipa::path(
    get,
    path = "/api/health",
    tag = "health",
    responses((status = 200, description = "Service is up"))
)]
#[get("/api/health")]
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "Server is running",
        "timestamp": Utc::now()
    }))
}

fn json_error(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    log::debug!("rejected json body on {}: {err}", req.path());

    let message = format!("Invalid request body: {err}");
    let body = if req.path() == "/api/paybill" {
        json!({ "paymentStatus": PaymentStatus::Failure, "message": message })
    } else {
        json!({ "success": false, "message": message })
    };

    actix_web::error::InternalError::from_response(err, HttpResponse::BadRequest().json(body))
        .into()
}

/// CORS policy for browser clients. An empty list allows any origin.
pub fn cors(origins: &[String]) -> Cors {
    let cors = if origins.is_empty() {
        Cors::default().allow_any_origin().send_wildcard()
    } else {
        origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
    };

    cors.allow_any_method().allow_any_header().max_age(3600)
}

/// Registers every route. Public routes carry their full `/api/...` path and
/// are registered before the token-protected `/api` scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .service(health)
        .service(auth::signup)
        .service(auth::login)
        .service(bills::pay_bill)
        .service(bills::list_plans)
        .service(
            web::scope("/api")
                .wrap(auth::JwtMiddleware)
                .service(auth::me)
                .service(auth::list_users)
                .service(payments::my_payments)
                .service(payments::all_payments)
                .service(payments::pending_payments)
                .service(payments::approve_payment)
                .service(payments::reject_payment),
        );
}
