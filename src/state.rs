use std::sync::Arc;

use crate::{
    config::AppConfig,
    gmail::MailboxConnector,
    llm::InferenceClient,
    store::{ApplicationStore, ProcessedLedger},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub applications: Arc<dyn ApplicationStore>,
    pub ledger: Arc<dyn ProcessedLedger>,
    pub inference: Arc<dyn InferenceClient>,
    pub mailbox: Arc<dyn MailboxConnector>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        applications: Arc<dyn ApplicationStore>,
        ledger: Arc<dyn ProcessedLedger>,
        inference: Arc<dyn InferenceClient>,
        mailbox: Arc<dyn MailboxConnector>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            applications,
            ledger,
            inference,
            mailbox,
        }
    }
}
