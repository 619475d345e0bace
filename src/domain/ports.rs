use crate::domain::model::{NotificationRequest, SubmissionRequest, SubmissionResult};
use crate::utils::error::{NotificationError, ScoringError};
use async_trait::async_trait;

/// The external TOPSIS service.
#[async_trait]
pub trait ScoringService: Send + Sync {
    async fn score(&self, request: &SubmissionRequest) -> Result<SubmissionResult, ScoringError>;

    /// Liveness text reported by the service.
    async fn health(&self) -> Result<String, ScoringError>;
}

/// The external message relay used to mail a result link.
#[async_trait]
pub trait NotificationRelay: Send + Sync {
    async fn send(&self, request: &NotificationRequest) -> Result<(), NotificationError>;
}

pub trait ServiceConfig: Send + Sync {
    fn base_url(&self) -> &str;
    fn scoring_path(&self) -> &str;
    fn health_path(&self) -> &str;
    fn timeout_seconds(&self) -> u64;
}
