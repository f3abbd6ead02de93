// src/api/auth.rs

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{get, post, web, Error, FromRequest, HttpMessage, HttpRequest, HttpResponse};
use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use futures_util::future::{ready, LocalBoxFuture, Ready};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use regex::Regex;
use serde_json::json;
use std::sync::LazyLock;
use std::task::{Context, Poll};
use utoipa::ToSchema;

use crate::config::AuthSettings;
use crate::error::ApiError;
use crate::models::{NewUser, PublicUser, Role, User};
use crate::AppState;

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: i32,
    role: Role,
    exp: usize,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub user: PublicUser,
}

/// Caller authenticated by [`JwtMiddleware`], available as `web::ReqData<AuthUser>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i32,
    pub role: Role,
}

fn generate_jwt(settings: &AuthSettings, user: &User) -> Result<String, ApiError> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::days(settings.token_ttl_days))
        .ok_or_else(|| ApiError::Internal("token expiry overflow".to_string()))?
        .timestamp() as usize;

    let claims = Claims {
        sub: user.id,
        role: user.role,
        exp: expiration,
    };

    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.jwt_secret.as_ref()),
    )?)
}

fn verify_jwt(secret: &str, token: &str) -> Result<AuthUser, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )?;

    Ok(AuthUser {
        id: data.claims.sub,
        role: data.claims.role,
    })
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

// ASCII word characters only; the top-level domain is 2 or 3 letters long.
static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?-u:\w)+([.-]?(?-u:\w)+)*@(?-u:\w)+([.-]?(?-u:\w)+)*(\.(?-u:\w){2,3})+$")
        .expect("email pattern compiles")
});

fn looks_like_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

fn validate_signup(payload: &SignupRequest) -> Result<(String, String), ApiError> {
    let full_name = payload.full_name.trim();
    if full_name.chars().count() < 2 {
        return Err(ApiError::Validation(
            "Name must be at least 2 characters".to_string(),
        ));
    }

    let email = normalize_email(&payload.email);
    if !looks_like_email(&email) {
        return Err(ApiError::Validation("Please enter a valid email".to_string()));
    }

    if payload.password.chars().count() < 6 {
        return Err(ApiError::Validation(
            "Password must be at least 6 characters".to_string(),
        ));
    }

    Ok((full_name.to_string(), email))
}

#[utoipa::path(
    post,
    path = "/api/auth/signup",
    tag = "auth",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "Account created", body = AuthResponse),
        (status = 400, description = "Invalid data or email already registered"),
        (status = 403, description = "Admin signup disabled")
    )
)]
#[post("/api/auth/signup")]
pub async fn signup(
    state: web::Data<AppState>,
    payload: web::Json<SignupRequest>,
) -> Result<HttpResponse, ApiError> {
    let (full_name, email) = validate_signup(&payload)?;

    let role = payload.role.unwrap_or(Role::User);
    if role == Role::Admin && !state.auth.allow_admin_signup {
        return Err(ApiError::Forbidden("Admin signup is disabled".to_string()));
    }

    let password = payload.password.clone();
    let cost = state.auth.bcrypt_cost;
    let password_hash = web::block(move || hash(password, cost)).await??;

    let user = state
        .users
        .create_user(NewUser {
            full_name,
            email,
            password_hash,
            role,
        })
        .await?;

    log::info!("user registered id={} role={}", user.id, user.role);

    let token = generate_jwt(&state.auth, &user)?;
    Ok(HttpResponse::Created().json(AuthResponse {
        success: true,
        token,
        user: user.into(),
    }))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
#[post("/api/auth/login")]
pub async fn login(
    state: web::Data<AppState>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let invalid = || ApiError::Unauthorized("Invalid credentials".to_string());

    let user = state
        .users
        .find_user_by_email(&normalize_email(&payload.email))
        .await?
        .ok_or_else(invalid)?;

    let password = payload.password.clone();
    let password_hash = user.password_hash.clone();
    if !web::block(move || verify(password, &password_hash)).await?? {
        return Err(invalid());
    }

    let token = generate_jwt(&state.auth, &user)?;
    Ok(HttpResponse::Ok().json(AuthResponse {
        success: true,
        token,
        user: user.into(),
    }))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    tag = "auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Current account"),
        (status = 401, description = "Missing or invalid token"),
        (status = 404, description = "Account no longer exists")
    )
)]
#[get("/auth/me")]
pub async fn me(
    state: web::Data<AppState>,
    caller: web::ReqData<AuthUser>,
) -> Result<HttpResponse, ApiError> {
    let user = state
        .users
        .find_user_by_id(caller.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "user": PublicUser::from(user)
    })))
}

#[utoipa::path(
    get,
    path = "/api/auth/users",
    tag = "auth",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "All accounts, newest first"),
        (status = 401, description = "Missing or invalid token"),
        (status = 403, description = "Caller is not an admin")
    )
)]
#[get("/auth/users")]
pub async fn list_users(
    state: web::Data<AppState>,
    _admin: AdminUser,
) -> Result<HttpResponse, ApiError> {
    let users: Vec<PublicUser> = state
        .users
        .list_users()
        .await?
        .into_iter()
        .map(PublicUser::from)
        .collect();

    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "count": users.len(),
        "users": users
    })))
}

/// Caller resolved from an optional bearer token.
///
/// A missing, malformed or expired token yields an anonymous caller instead
/// of an error: routes using this extractor must keep working without login.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity {
    pub user_id: Option<i32>,
}

impl FromRequest for Identity {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let Some(token) = bearer_token(req) else {
            return ready(Ok(Identity::default()));
        };
        let Some(state) = req.app_data::<web::Data<AppState>>() else {
            return ready(Ok(Identity::default()));
        };

        let user_id = match verify_jwt(&state.auth.jwt_secret, token) {
            Ok(user) => Some(user.id),
            Err(e) => {
                log::debug!("ignoring invalid bearer token on optional-auth route: {e}");
                None
            }
        };

        ready(Ok(Identity { user_id }))
    }
}

/// Authenticated caller holding the admin role. Requires [`JwtMiddleware`]
/// upstream.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub AuthUser);

impl FromRequest for AdminUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let caller = req.extensions().get::<AuthUser>().copied();
        ready(match caller {
            None => Err(ApiError::Unauthorized(
                "Not authorized, no token".to_string(),
            )),
            Some(user) if user.role == Role::Admin => Ok(AdminUser(user)),
            Some(user) => Err(ApiError::Forbidden(format!(
                "User role {} is not authorized to access this route",
                user.role
            ))),
        })
    }
}

/// Middleware, which:
/// - takes `Authorization: Bearer <jwt>`
/// - validates the JWT against the configured secret
/// - puts an [`AuthUser`] into `req.extensions_mut()`
pub struct JwtMiddleware;

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = JwtMiddlewareInner<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtMiddlewareInner { service }))
    }
}

pub struct JwtMiddlewareInner<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareInner<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let verified = match req.app_data::<web::Data<AppState>>() {
            None => Err(ApiError::Internal(
                "application state not configured".to_string(),
            )),
            Some(state) => bearer_token(req.request())
                .ok_or_else(|| ApiError::Unauthorized("Not authorized, no token".to_string()))
                .and_then(|token| {
                    verify_jwt(&state.auth.jwt_secret, token).map_err(|e| {
                        log::debug!("rejected bearer token: {e}");
                        ApiError::Unauthorized("Not authorized, token failed".to_string())
                    })
                }),
        };

        match verified {
            Ok(user) => {
                req.extensions_mut().insert(user);
                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
            }
            // Rendered here so the refusal reaches the client as a response,
            // not as a service error.
            Err(e) => {
                let resp = req.error_response(e).map_into_right_body();
                Box::pin(async move { Ok(resp) })
            }
        }
    }
}
