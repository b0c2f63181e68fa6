use crate::db::StockRepository;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub timestamp: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status == "healthy"
    }
}

pub struct HealthChecker {
    repository: Arc<dyn StockRepository>,
}

impl HealthChecker {
    pub fn new(repository: Arc<dyn StockRepository>) -> Self {
        Self { repository }
    }

    /// Healthy when the data store answers a trivial query.
    pub async fn check(&self) -> HealthStatus {
        let timestamp = chrono::Utc::now().to_rfc3339();
        let version = env!("CARGO_PKG_VERSION").to_string();

        match self.repository.ping().await {
            Ok(()) => HealthStatus {
                status: "healthy".to_string(),
                timestamp,
                version,
                error: None,
            },
            Err(e) => {
                tracing::error!(error = %e, "Health check failed");
                HealthStatus {
                    status: "unhealthy".to_string(),
                    timestamp,
                    version,
                    error: Some(format!("Database check failed: {}", e)),
                }
            }
        }
    }
}
