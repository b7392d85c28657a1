use async_trait::async_trait;
use aws_sdk_sns::Client as SnsClient;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// A "result published" domain event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultPublished {
    pub category: Id,
    pub label: String,
    pub winner: Id,
    pub votes: u64,
    pub published_at: DateTime<Utc>,
}

/// Errors produced by a notification sink.
pub type NotifyError = Box<dyn std::error::Error + Send + Sync>;

/// Best-effort sink for domain events.
///
/// Publication must never fail because a sink does; the engine logs a
/// delivery failure and moves on.
#[async_trait]
pub trait ResultNotifier: Send + Sync {
    /// Deliver a "result published" event.
    async fn result_published(&self, event: &ResultPublished) -> Result<(), NotifyError>;
}

/// Publishes events to an SNS topic as JSON.
///
/// The client is constructed by the host; this crate never assembles AWS
/// credentials itself.
pub struct SnsNotifier {
    client: SnsClient,
    topic_arn: String,
}

impl SnsNotifier {
    /// Wrap an already-configured SNS client.
    pub fn new(client: SnsClient, topic_arn: impl Into<String>) -> Self {
        Self {
            client,
            topic_arn: topic_arn.into(),
        }
    }
}

#[async_trait]
impl ResultNotifier for SnsNotifier {
    async fn result_published(&self, event: &ResultPublished) -> Result<(), NotifyError> {
        let message = serde_json::to_string(event)?;
        self.client
            .publish()
            .topic_arn(&self.topic_arn)
            .subject(format!("Vote result published: {}", event.label))
            .message(message)
            .send()
            .await?;
        Ok(())
    }
}
