use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::config::ServerConfig;
use crate::services::checker_service::FileChecker;

// 应用状态管理
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub checker: Arc<dyn FileChecker>,
    pub check_semaphore: Arc<Semaphore>,
    pub request_count: Arc<AtomicU64>,
    pub error_count: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(config: ServerConfig, checker: Arc<dyn FileChecker>) -> Self {
        let permits = config.max_concurrent_checks;
        Self {
            config: Arc::new(config),
            checker,
            check_semaphore: Arc::new(Semaphore::new(permits)),
            request_count: Arc::new(AtomicU64::new(0)),
            error_count: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn record_request(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> serde_json::Value {
        serde_json::json!({
            "total_requests": self.request_count.load(Ordering::Relaxed),
            "total_errors": self.error_count.load(Ordering::Relaxed),
            "available_check_permits": self.check_semaphore.available_permits(),
        })
    }
}
