use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::health,
        crate::api::auth::signup,
        crate::api::auth::login,
        crate::api::auth::me,
        crate::api::auth::list_users,
        crate::api::bills::pay_bill,
        crate::api::bills::list_plans,
        crate::api::payments::my_payments,
        crate::api::payments::all_payments,
        crate::api::payments::pending_payments,
        crate::api::payments::approve_payment,
        crate::api::payments::reject_payment
    ),
    components(
        schemas(
            crate::api::auth::SignupRequest,
            crate::api::auth::LoginRequest,
            crate::api::auth::AuthResponse,
            crate::billing::BillRequest,
            crate::billing::PaymentOutcome,
            crate::models::PaymentRecord,
            crate::models::PaymentStatus,
            crate::models::ApprovalStatus,
            crate::models::PublicUser,
            crate::models::Role,
            crate::plans::Plan
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Accounts and tokens"),
        (name = "bills", description = "Plan catalog and bill payments"),
        (name = "payments", description = "Payment history and admin approval"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;
