//! Liveness and readiness reporting
//!
//! Reports whether the artifacts loaded at startup. Carries no business
//! logic; the process stays up either way.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ArtifactState;

/// Overall service health
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Artifacts loaded, predictions are served
    Healthy,
    /// Artifacts unavailable, every prediction fails with a 500
    Degraded,
}

/// Status report returned by `GET /` and `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceStatus {
    pub service: String,
    pub version: String,
    pub status: HealthStatus,
    pub artifacts_loaded: bool,
    /// Why loading failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loaded_at: Option<DateTime<Utc>>,
}

impl ServiceStatus {
    /// Build a report from the artifact state
    pub fn from_state(state: &ArtifactState) -> Self {
        let status = if state.is_ready() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };

        Self {
            service: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            status,
            artifacts_loaded: state.is_ready(),
            reason: state.reason().map(str::to_string),
            loaded_at: state.artifacts().map(|a| a.loaded_at()),
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}
