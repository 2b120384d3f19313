use std::sync::Arc;

use crate::{
    config::AppConfig, db::OrmConn, gateway::PaymentGateway, mailer::Mailer,
    stores::SettingsStore,
};

#[derive(Clone)]
pub struct AppState {
    pub orm: OrmConn,
    pub config: Arc<AppConfig>,
    pub payments: Arc<dyn PaymentGateway>,
    pub mailer: Arc<dyn Mailer>,
    /// Cached public settings; reloaded whenever an admin saves settings.
    pub public_settings: SettingsStore,
}

impl AppState {
    pub fn new(
        orm: OrmConn,
        config: AppConfig,
        payments: Arc<dyn PaymentGateway>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        Self {
            orm,
            config: Arc::new(config),
            payments,
            mailer,
            public_settings: SettingsStore::default(),
        }
    }
}
