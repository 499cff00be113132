pub mod assets;
pub mod common;
pub mod procurement_orders;

use crate::{
    config::AppConfig,
    db::DbPool,
    events::EventSender,
    services::{assets::AssetService, procurement::ProcurementService},
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub procurement: Arc<ProcurementService>,
    pub assets: Arc<AssetService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            procurement: Arc::new(ProcurementService::new(
                db_pool.clone(),
                event_sender.clone(),
                config,
            )),
            assets: Arc::new(AssetService::new(db_pool, event_sender)),
        }
    }
}
