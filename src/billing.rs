// src/billing.rs

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value};
use utoipa::ToSchema;

use crate::db::PaymentStore;
use crate::error::StoreError;
use crate::models::{ApprovalStatus, NewPayment, PaymentRecord, PaymentStatus};
use crate::plans::{Plan, PlanCatalog};

/// Body of `POST /paybill`. Every field is optional at the wire level so the
/// processor decides which validation message applies.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BillRequest {
    pub consumer_id: Option<String>,
    pub plan_name: Option<String>,
    /// `None` only when the key is absent; an explicit `null` is kept as
    /// `Value::Null` and rejected as invalid units.
    #[serde(default, deserialize_with = "present_value")]
    #[schema(value_type = Option<f64>)]
    pub units_used: Option<Value>,
}

fn present_value<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Reasons a bill is refused before anything is persisted.
#[derive(Debug, thiserror::Error)]
pub enum BillError {
    #[error("Missing required fields: consumerId, planName, and unitsUsed are required")]
    MissingFields,
    #[error("Consumer ID cannot be empty")]
    EmptyConsumerId,
    #[error("Units used must be a positive number")]
    InvalidUnits,
    #[error("Plan \"{0}\" not found")]
    PlanNotFound(String),
    #[error("Plan \"{0}\" is not active")]
    PlanInactive(String),
    #[error("Server error occurred while processing payment")]
    Storage(#[from] StoreError),
}

impl ResponseError for BillError {
    fn status_code(&self) -> StatusCode {
        match self {
            BillError::PlanNotFound(_) => StatusCode::NOT_FOUND,
            BillError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let BillError::Storage(e) = self {
            log::error!("paybill storage error: {e}");
        }

        HttpResponse::build(self.status_code()).json(json!({
            "paymentStatus": PaymentStatus::Failure,
            "message": self.to_string()
        }))
    }
}

/// Outcome of charging `units_used` against a plan.
#[derive(Debug, Clone, PartialEq)]
pub struct Charge {
    pub total_amount: Decimal,
    pub remaining_units: Decimal,
    pub payment_status: PaymentStatus,
    pub message: String,
}

/// Returns `None` when the amount does not fit in a `Decimal`.
pub fn compute_charge(plan: &Plan, units_used: Decimal) -> Option<Charge> {
    let included = Decimal::from(plan.units_included);
    let total_amount = units_used.checked_mul(plan.price_per_unit)?;
    // Informational only, may go negative.
    let remaining_units = included.checked_sub(units_used)?;

    let (payment_status, message) = if units_used <= included {
        (
            PaymentStatus::Success,
            "Payment processed successfully".to_string(),
        )
    } else {
        (
            PaymentStatus::Failure,
            format!(
                "Insufficient units. Plan includes {} units, but {} units were used.",
                plan.units_included,
                units_used.normalize()
            ),
        )
    };

    Some(Charge {
        total_amount,
        remaining_units,
        payment_status,
        message,
    })
}

/// Response of a validated bill, whether the charge succeeded or not.
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOutcome {
    pub payment_status: PaymentStatus,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub remaining_units: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub total_amount: Decimal,
    pub message: String,
    pub transaction_id: i32,
    pub transaction_date: DateTime<Utc>,
}

#[derive(Debug)]
struct ValidatedBill<'a> {
    consumer_id: String,
    plan: &'a Plan,
    units_used: Decimal,
}

fn parse_units(value: &Value) -> Option<Decimal> {
    let Value::Number(number) = value else {
        return None;
    };
    let units = if let Some(i) = number.as_i64() {
        Decimal::from(i)
    } else if let Some(u) = number.as_u64() {
        Decimal::from(u)
    } else {
        Decimal::from_f64(number.as_f64()?)?
    };

    (units >= Decimal::ZERO).then_some(units)
}

/// Turns bill requests into persisted payment records.
#[derive(Clone)]
pub struct BillProcessor {
    catalog: Arc<PlanCatalog>,
    store: Arc<dyn PaymentStore>,
}

impl BillProcessor {
    pub fn new(catalog: Arc<PlanCatalog>, store: Arc<dyn PaymentStore>) -> Self {
        Self { catalog, store }
    }

    pub fn catalog(&self) -> &PlanCatalog {
        &self.catalog
    }

    fn validate<'a>(&'a self, req: &BillRequest) -> Result<ValidatedBill<'a>, BillError> {
        let (Some(consumer_id), Some(plan_name), Some(units_used)) =
            (&req.consumer_id, &req.plan_name, &req.units_used)
        else {
            return Err(BillError::MissingFields);
        };
        if consumer_id.is_empty() || plan_name.is_empty() {
            return Err(BillError::MissingFields);
        }

        let consumer_id = consumer_id.trim();
        if consumer_id.is_empty() {
            return Err(BillError::EmptyConsumerId);
        }

        let units_used = parse_units(units_used).ok_or(BillError::InvalidUnits)?;

        let plan = self
            .catalog
            .find_plan(plan_name)
            .ok_or_else(|| BillError::PlanNotFound(plan_name.clone()))?;
        if !plan.active {
            return Err(BillError::PlanInactive(plan_name.clone()));
        }

        Ok(ValidatedBill {
            consumer_id: consumer_id.to_string(),
            plan,
            units_used,
        })
    }

    /// Validates, charges and persists one bill. Failed charges are still
    /// stored; only validation errors skip persistence.
    pub async fn process_payment(
        &self,
        req: &BillRequest,
        owner_id: Option<i32>,
    ) -> Result<PaymentOutcome, BillError> {
        let bill = self.validate(req)?;
        let charge = compute_charge(bill.plan, bill.units_used).ok_or_else(|| {
            log::warn!("paybill units={} overflow the charge", bill.units_used);
            BillError::InvalidUnits
        })?;

        let record = self
            .store
            .insert_payment(NewPayment {
                owner_id,
                consumer_id: bill.consumer_id,
                plan_name: bill.plan.name.clone(),
                units_used: bill.units_used,
                amount_paid: charge.total_amount,
                remaining_units: charge.remaining_units,
                payment_status: charge.payment_status,
            })
            .await?;

        log::info!(
            "bill processed id={} consumer={} plan={} status={} owner={:?}",
            record.id,
            record.consumer_id,
            record.plan_name,
            record.payment_status,
            record.owner_id
        );

        Ok(PaymentOutcome {
            payment_status: charge.payment_status,
            remaining_units: charge.remaining_units,
            total_amount: charge.total_amount,
            message: charge.message,
            transaction_id: record.id,
            transaction_date: record.transaction_date,
        })
    }
}

/// Admin verdict on a payment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Reject,
}

impl Decision {
    pub fn target(self) -> ApprovalStatus {
        match self {
            Decision::Approve => ApprovalStatus::Approved,
            Decision::Reject => ApprovalStatus::Rejected,
        }
    }
}

/// Applies an admin decision to a payment record. Returns `Ok(None)` for an
/// unknown id.
///
/// Terminal states are not guarded: a later decision overwrites an earlier
/// one and concurrent decisions race with the last write winning.
pub async fn set_approval_status(
    store: &dyn PaymentStore,
    payment_id: i32,
    decision: Decision,
) -> Result<Option<PaymentRecord>, StoreError> {
    let updated = store
        .set_approval_status(payment_id, decision.target())
        .await?;

    match &updated {
        Some(record) => log::info!(
            "payment id={} approval_status={}",
            record.id,
            record.approval_status
        ),
        None => log::warn!("approval on unknown payment id={payment_id}"),
    }

    Ok(updated)
}
