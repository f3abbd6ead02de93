#![allow(dead_code)]

use actix_web::body::MessageBody;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::test::{self, TestRequest};
use actix_web::web;
use serde_json::{json, Value};
use sqlx::PgPool;
use std::env;
use std::sync::{Arc, OnceLock};
use tokio::sync::{Mutex, MutexGuard};

use voltpay::config::AuthSettings;
use voltpay::db::memory::MemoryStore;
use voltpay::plans::PlanCatalog;
use voltpay::AppState;

pub const JWT_SECRET: &str = "test-secret";

pub fn auth_settings(allow_admin_signup: bool) -> AuthSettings {
    AuthSettings {
        jwt_secret: JWT_SECRET.to_string(),
        token_ttl_days: 1,
        bcrypt_cost: 4,
        allow_admin_signup,
    }
}

/// App state over a fresh in-memory store. The store handle is returned so
/// tests can count persisted records.
pub fn memory_state(allow_admin_signup: bool) -> (web::Data<AppState>, Arc<MemoryStore>) {
    memory_state_with_catalog(PlanCatalog::default(), allow_admin_signup)
}

pub fn memory_state_with_catalog(
    catalog: PlanCatalog,
    allow_admin_signup: bool,
) -> (web::Data<AppState>, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::default());
    let state = AppState::new(
        Arc::new(catalog),
        store.clone(),
        store.clone(),
        auth_settings(allow_admin_signup),
    );
    (web::Data::new(state), store)
}

/// Registers an account and returns `(token, user_id)`.
pub async fn signup<S, B>(app: &S, full_name: &str, email: &str, role: &str) -> (String, i64)
where
    S: Service<actix_http::Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = TestRequest::post()
        .uri("/api/auth/signup")
        .set_json(json!({
            "fullName": full_name,
            "email": email,
            "password": "secret123",
            "role": role
        }))
        .to_request();

    let body: Value = test::call_and_read_body_json(app, req).await;
    let token = body["token"].as_str().expect("token in signup response");
    let user_id = body["user"]["id"].as_i64().expect("user id in signup response");
    (token.to_string(), user_id)
}

pub fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

fn split_db_url(url: &str) -> Result<(String, String), String> {
    let (base, query) = match url.split_once('?') {
        Some((base, query)) => (base.to_string(), Some(query)),
        None => (url.to_string(), None),
    };

    let db_start = base
        .rfind('/')
        .ok_or_else(|| "invalid database url".to_string())?;
    if db_start + 1 >= base.len() {
        return Err("database name is empty".to_string());
    }

    let db_name = base[db_start + 1..].to_string();
    let mut admin_url = format!("{}postgres", &base[..db_start + 1]);
    if let Some(query) = query {
        admin_url = format!("{admin_url}?{query}");
    }

    Ok((admin_url, db_name))
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

static TEST_DB_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

pub struct TestDb {
    pub pool: PgPool,
    _guard: MutexGuard<'static, ()>,
}

/// Recreates the database named by `TEST_DATABASE_URL` and runs migrations.
/// Returns `None` when the variable is not set.
pub async fn init_test_db() -> Option<TestDb> {
    dotenvy::dotenv().ok();
    let Ok(test_url) = env::var("TEST_DATABASE_URL") else {
        eprintln!("TEST_DATABASE_URL not set, skipping postgres test");
        return None;
    };
    let (admin_url, db_name) = split_db_url(&test_url).expect("invalid TEST_DATABASE_URL format");

    let lock = TEST_DB_LOCK.get_or_init(|| Mutex::new(()));
    let guard = lock.lock().await;

    let admin_pool = PgPool::connect(&admin_url)
        .await
        .expect("connect admin db");

    let quoted_name = quote_identifier(&db_name);
    let _ = sqlx::query(&format!("DROP DATABASE IF EXISTS {quoted_name} WITH (FORCE)"))
        .execute(&admin_pool)
        .await;
    sqlx::query(&format!("CREATE DATABASE {quoted_name}"))
        .execute(&admin_pool)
        .await
        .expect("create test db");
    admin_pool.close().await;

    let pool = PgPool::connect(&test_url).await.expect("connect test db");
    sqlx::migrate!().run(&pool).await.expect("migrations");

    Some(TestDb {
        pool,
        _guard: guard,
    })
}
