// src/db/mod.rs

use async_trait::async_trait;

use crate::error::StoreError;
use crate::models::{ApprovalStatus, NewPayment, NewUser, PaymentRecord, User};

pub mod memory;
pub mod postgres;

/// Page size of a user's own payment history.
pub const OWN_HISTORY_LIMIT: i64 = 50;
/// Page size of admin-wide payment listings.
pub const ADMIN_LISTING_LIMIT: i64 = 100;

/// Persistence of payment records. Listings are newest first.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn insert_payment(&self, payment: NewPayment) -> Result<PaymentRecord, StoreError>;

    async fn list_owner_payments(
        &self,
        owner_id: i32,
        limit: i64,
    ) -> Result<Vec<PaymentRecord>, StoreError>;

    /// All payments, optionally restricted to one approval status.
    async fn list_payments(
        &self,
        approval: Option<ApprovalStatus>,
        limit: i64,
    ) -> Result<Vec<PaymentRecord>, StoreError>;

    /// Overwrites the approval status in place. `None` if the id is unknown.
    async fn set_approval_status(
        &self,
        payment_id: i32,
        status: ApprovalStatus,
    ) -> Result<Option<PaymentRecord>, StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`StoreError::DuplicateEmail`] if the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_id(&self, id: i32) -> Result<Option<User>, StoreError>;

    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
}
