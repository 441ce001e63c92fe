use std::sync::Arc;

use crate::application::DocumentService;
use crate::infrastructure::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub document_service: Arc<DocumentService>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(document_service: Arc<DocumentService>, config: AppConfig) -> Self {
        Self {
            document_service,
            config: Arc::new(config),
        }
    }
}
