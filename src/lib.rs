pub mod api;
pub mod billing;
pub mod config;
pub mod db;
pub mod docs;
pub mod error;
pub mod models;
pub mod plans;

use std::sync::Arc;

use billing::BillProcessor;
use config::AuthSettings;
use db::{PaymentStore, UserStore};
use plans::PlanCatalog;

#[derive(Clone)]
pub struct AppState {
    pub bills: BillProcessor,
    pub payments: Arc<dyn PaymentStore>,
    pub users: Arc<dyn UserStore>,
    pub auth: AuthSettings,
}

impl AppState {
    pub fn new(
        catalog: Arc<PlanCatalog>,
        payments: Arc<dyn PaymentStore>,
        users: Arc<dyn UserStore>,
        auth: AuthSettings,
    ) -> Self {
        Self {
            bills: BillProcessor::new(catalog, payments.clone()),
            payments,
            users,
            auth,
        }
    }
}
