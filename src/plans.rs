// src/plans.rs

use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Prepaid electricity tariff.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64)]
    pub price_per_unit: Decimal,
    pub units_included: u32,
    pub validity_days: u32,
    pub active: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read plans file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse plans file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate plan name: {0}")]
    DuplicateName(String),
    #[error("invalid plan {name}: {reason}")]
    InvalidPlan { name: String, reason: &'static str },
}

/// Read-only set of plans, fixed once the process starts.
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    plans: Vec<Plan>,
}

impl PlanCatalog {
    pub fn new(plans: Vec<Plan>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for plan in &plans {
            if plan.name.trim().is_empty() {
                return Err(CatalogError::InvalidPlan {
                    name: plan.name.clone(),
                    reason: "name is empty",
                });
            }
            if plan.price_per_unit <= Decimal::ZERO {
                return Err(CatalogError::InvalidPlan {
                    name: plan.name.clone(),
                    reason: "price per unit must be positive",
                });
            }
            if plan.units_included == 0 {
                return Err(CatalogError::InvalidPlan {
                    name: plan.name.clone(),
                    reason: "units included must be positive",
                });
            }
            if plan.validity_days == 0 {
                return Err(CatalogError::InvalidPlan {
                    name: plan.name.clone(),
                    reason: "validity must be positive",
                });
            }
            if !seen.insert(plan.name.to_lowercase()) {
                return Err(CatalogError::DuplicateName(plan.name.clone()));
            }
        }

        Ok(Self { plans })
    }

    /// Loads a catalog from a JSON array of plans.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let raw = std::fs::read_to_string(path)?;
        let plans: Vec<Plan> = serde_json::from_str(&raw)?;
        Self::new(plans)
    }

    /// Case-insensitive exact match on the plan name.
    /// Inactive plans are returned too; callers check `active` themselves.
    pub fn find_plan(&self, name: &str) -> Option<&Plan> {
        let wanted = name.to_lowercase();
        self.plans.iter().find(|p| p.name.to_lowercase() == wanted)
    }

    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }
}

impl Default for PlanCatalog {
    fn default() -> Self {
        let plan = |name: &str, price: Decimal, units: u32, validity: u32| Plan {
            name: name.to_string(),
            price_per_unit: price,
            units_included: units,
            validity_days: validity,
            active: true,
        };

        Self {
            plans: vec![
                plan("Basic Plan", Decimal::new(5, 0), 100, 30),
                plan("Standard Plan", Decimal::new(45, 1), 250, 30),
                plan("Premium Plan", Decimal::new(4, 0), 500, 30),
                plan("Ultra Plan", Decimal::new(35, 1), 1000, 60),
            ],
        }
    }
}
