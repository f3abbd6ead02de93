// src/db/memory.rs
//
// In-process store for tests and `STORAGE=memory` runs. Data is lost on exit.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{PaymentStore, UserStore};
use crate::error::StoreError;
use crate::models::{ApprovalStatus, NewPayment, NewUser, PaymentRecord, User};

#[derive(Default)]
struct Tables {
    payments: Vec<PaymentRecord>,
    users: Vec<User>,
    next_payment_id: i32,
    next_user_id: i32,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub async fn payment_count(&self) -> usize {
        self.tables.read().await.payments.len()
    }

    pub async fn payment(&self, id: i32) -> Option<PaymentRecord> {
        self.tables
            .read()
            .await
            .payments
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }
}

// Newest first; ids break ties between records created in the same instant.
fn newest_first<'a>(
    records: impl Iterator<Item = &'a PaymentRecord>,
    limit: i64,
) -> Vec<PaymentRecord> {
    let mut out: Vec<PaymentRecord> = records.cloned().collect();
    out.sort_by(|a, b| {
        b.transaction_date
            .cmp(&a.transaction_date)
            .then(b.id.cmp(&a.id))
    });
    out.truncate(usize::try_from(limit).unwrap_or(0));
    out
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn insert_payment(&self, p: NewPayment) -> Result<PaymentRecord, StoreError> {
        let mut tables = self.tables.write().await;
        tables.next_payment_id += 1;

        let record = PaymentRecord {
            id: tables.next_payment_id,
            owner_id: p.owner_id,
            consumer_id: p.consumer_id,
            plan_name: p.plan_name,
            units_used: p.units_used,
            amount_paid: p.amount_paid,
            remaining_units: p.remaining_units,
            payment_status: p.payment_status,
            approval_status: ApprovalStatus::Pending,
            transaction_date: Utc::now(),
        };
        tables.payments.push(record.clone());

        Ok(record)
    }

    async fn list_owner_payments(
        &self,
        owner_id: i32,
        limit: i64,
    ) -> Result<Vec<PaymentRecord>, StoreError> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables
                .payments
                .iter()
                .filter(|p| p.owner_id == Some(owner_id)),
            limit,
        ))
    }

    async fn list_payments(
        &self,
        approval: Option<ApprovalStatus>,
        limit: i64,
    ) -> Result<Vec<PaymentRecord>, StoreError> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables
                .payments
                .iter()
                .filter(|p| approval.map_or(true, |a| p.approval_status == a)),
            limit,
        ))
    }

    async fn set_approval_status(
        &self,
        payment_id: i32,
        status: ApprovalStatus,
    ) -> Result<Option<PaymentRecord>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .payments
            .iter_mut()
            .find(|p| p.id == payment_id)
            .map(|p| {
                p.approval_status = status;
                p.clone()
            }))
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, u: NewUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|existing| existing.email == u.email) {
            return Err(StoreError::DuplicateEmail(u.email));
        }
        tables.next_user_id += 1;

        let user = User {
            id: tables.next_user_id,
            full_name: u.full_name,
            email: u.email,
            password_hash: u.password_hash,
            role: u.role,
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());

        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: i32) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.read().await;
        let mut users = tables.users.clone();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(users)
    }
}
