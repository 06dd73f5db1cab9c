//! Shared application state handed to every request handler

use std::sync::Arc;

use crate::config::Settings;
use crate::database::DatabaseService;
use crate::services::ServiceFactory;

/// Cheap to clone; everything behind it is shared
#[derive(Clone, Debug)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub database: DatabaseService,
    pub services: Arc<ServiceFactory>,
}

impl AppState {
    pub fn new(settings: Settings, database: DatabaseService, services: ServiceFactory) -> Self {
        Self {
            settings: Arc::new(settings),
            database,
            services: Arc::new(services),
        }
    }
}
