//! Notification fan-out to subscribed chats.

use crate::db::Database;
use crate::gateway::MessagingGateway;
use crate::subscription::SubscriptionKind;
use futures_util::future::join_all;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Error, Debug)]
pub enum NotifierError {
    #[error("Failed to resolve subscribers: {0}")]
    Db(#[from] crate::db::DbError),
}

/// Configuration for the notifier.
#[derive(Debug, Clone, Default)]
pub struct NotifierConfig {
    /// When set, only this chat receives notifications (development runs).
    pub only_chat: Option<i64>,
}

/// Result of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FanoutSummary {
    pub recipients: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Delivers a rendered message to every chat subscribed to a symbol.
pub struct Notifier {
    db: Database,
    gateway: Arc<dyn MessagingGateway>,
    config: NotifierConfig,
}

impl Notifier {
    /// Create a new notifier.
    pub fn new(db: Database, gateway: Arc<dyn MessagingGateway>, config: NotifierConfig) -> Self {
        Self {
            db,
            gateway,
            config,
        }
    }

    /// Send `message` to all subscribers of `symbol` (and of `all`).
    ///
    /// Recipients are delivered to concurrently and independently; a failed
    /// delivery is logged and counted but never aborts the others. Only
    /// subscriber resolution can fail the call.
    pub async fn notify(
        &self,
        symbol: &str,
        kind: SubscriptionKind,
        message: &str,
    ) -> Result<FanoutSummary, NotifierError> {
        let mut subscribers = self.db.list_subscribers(symbol, kind).await?;

        if let Some(only) = self.config.only_chat {
            subscribers.retain(|&chat_id| chat_id == only);
        }

        if subscribers.is_empty() {
            debug!(symbol, %kind, "No subscribers");
            return Ok(FanoutSummary::default());
        }

        let deliveries = subscribers.iter().map(|&chat_id| async move {
            match self.gateway.deliver(chat_id, message).await {
                Ok(()) => true,
                Err(e) => {
                    error!(chat_id, symbol, error = %e, "Failed to send notification");
                    false
                }
            }
        });
        let results = join_all(deliveries).await;

        let delivered = results.iter().filter(|ok| **ok).count();
        let summary = FanoutSummary {
            recipients: results.len(),
            delivered,
            failed: results.len() - delivered,
        };
        info!(
            symbol,
            %kind,
            recipients = summary.recipients,
            delivered = summary.delivered,
            failed = summary.failed,
            "Notification fan-out complete"
        );
        Ok(summary)
    }
}
