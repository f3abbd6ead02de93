// src/db/postgres.rs

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use super::{PaymentStore, UserStore};
use crate::error::StoreError;
use crate::models::{ApprovalStatus, NewPayment, NewUser, PaymentRecord, User};

const PAYMENT_COLUMNS: &str = "id, owner_id, consumer_id, plan_name, units_used, amount_paid, \
     remaining_units, payment_status, approval_status, transaction_date";

const USER_COLUMNS: &str = "id, full_name, email, password_hash, role, created_at";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!().run(&self.pool).await
    }
}

fn payment_from_row(r: PgRow) -> Result<PaymentRecord, StoreError> {
    let payment_status: String = r.get("payment_status");
    let approval_status: String = r.get("approval_status");

    Ok(PaymentRecord {
        id: r.get("id"),
        owner_id: r.get("owner_id"),
        consumer_id: r.get("consumer_id"),
        plan_name: r.get("plan_name"),
        units_used: r.get("units_used"),
        amount_paid: r.get("amount_paid"),
        remaining_units: r.get("remaining_units"),
        payment_status: payment_status
            .parse()
            .map_err(|e| StoreError::CorruptRow(format!("{e}")))?,
        approval_status: approval_status
            .parse()
            .map_err(|e| StoreError::CorruptRow(format!("{e}")))?,
        transaction_date: r.get("transaction_date"),
    })
}

fn user_from_row(r: PgRow) -> Result<User, StoreError> {
    let role: String = r.get("role");

    Ok(User {
        id: r.get("id"),
        full_name: r.get("full_name"),
        email: r.get("email"),
        password_hash: r.get("password_hash"),
        role: role.parse().map_err(|e| StoreError::CorruptRow(format!("{e}")))?,
        created_at: r.get("created_at"),
    })
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .and_then(|d| d.code())
        .is_some_and(|code| code == "23505")
}

#[async_trait]
impl PaymentStore for PgStore {
    async fn insert_payment(&self, p: NewPayment) -> Result<PaymentRecord, StoreError> {
        let row = sqlx::query(&format!(
            r#"INSERT INTO payments
                   (owner_id, consumer_id, plan_name, units_used, amount_paid, remaining_units,
                    payment_status, approval_status)
               VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending')
               RETURNING {PAYMENT_COLUMNS}"#
        ))
        .bind(p.owner_id)
        .bind(&p.consumer_id)
        .bind(&p.plan_name)
        .bind(p.units_used)
        .bind(p.amount_paid)
        .bind(p.remaining_units)
        .bind(p.payment_status.as_str())
        .fetch_one(&self.pool)
        .await?;

        payment_from_row(row)
    }

    async fn list_owner_payments(
        &self,
        owner_id: i32,
        limit: i64,
    ) -> Result<Vec<PaymentRecord>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"SELECT {PAYMENT_COLUMNS}
               FROM payments
               WHERE owner_id = $1
               ORDER BY transaction_date DESC, id DESC
               LIMIT $2"#
        ))
        .bind(owner_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(payment_from_row).collect()
    }

    async fn list_payments(
        &self,
        approval: Option<ApprovalStatus>,
        limit: i64,
    ) -> Result<Vec<PaymentRecord>, StoreError> {
        let rows = sqlx::query(&format!(
            r#"SELECT {PAYMENT_COLUMNS}
               FROM payments
               WHERE ($1::text IS NULL OR approval_status = $1)
               ORDER BY transaction_date DESC, id DESC
               LIMIT $2"#
        ))
        .bind(approval.map(|a| a.as_str()))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(payment_from_row).collect()
    }

    async fn set_approval_status(
        &self,
        payment_id: i32,
        status: ApprovalStatus,
    ) -> Result<Option<PaymentRecord>, StoreError> {
        let row = sqlx::query(&format!(
            r#"UPDATE payments
               SET approval_status = $1
               WHERE id = $2
               RETURNING {PAYMENT_COLUMNS}"#
        ))
        .bind(status.as_str())
        .bind(payment_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(payment_from_row).transpose()
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, u: NewUser) -> Result<User, StoreError> {
        let result = sqlx::query(&format!(
            r#"INSERT INTO users (full_name, email, password_hash, role)
               VALUES ($1, $2, $3, $4)
               RETURNING {USER_COLUMNS}"#
        ))
        .bind(&u.full_name)
        .bind(&u.email)
        .bind(&u.password_hash)
        .bind(u.role.as_str())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => user_from_row(row),
            Err(e) if is_unique_violation(&e) => Err(StoreError::DuplicateEmail(u.email)),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(user_from_row).transpose()
    }

    async fn find_user_by_id(&self, id: i32) -> Result<Option<User>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(user_from_row).transpose()
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(user_from_row).collect()
    }
}
