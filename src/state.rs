use crate::calendar::GridCache;
use crate::clock::Clock;
use crate::config::AppConfig;
use crate::service::CounterService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub service: CounterService,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<AppConfig>,
    pub grid: GridCache,
}

impl AppState {
    pub fn new(service: CounterService, clock: Arc<dyn Clock>, config: AppConfig) -> Self {
        Self {
            service,
            clock,
            config: Arc::new(config),
            grid: GridCache::new(),
        }
    }
}
