//! Subscription types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of notification a subscription covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionKind {
    /// Governance proposal notifications.
    #[default]
    Proposal,
}

impl SubscriptionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SubscriptionKind::Proposal => "proposal",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "proposal" => Some(SubscriptionKind::Proposal),
            _ => None,
        }
    }
}

impl fmt::Display for SubscriptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A chat's subscription to one symbol, as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Database ID
    pub id: i64,
    /// Telegram chat ID receiving notifications
    pub chat_id: i64,
    /// Canonical symbol, or `all`
    pub symbol: String,
    pub kind: SubscriptionKind,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl Subscription {
    pub fn is_all(&self) -> bool {
        self.symbol == proposal_core::ALL_SYMBOLS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_storage_name() {
        let kind = SubscriptionKind::Proposal;
        assert_eq!(kind.as_str(), "proposal");
        assert_eq!(SubscriptionKind::parse(kind.as_str()), Some(kind));
        assert_eq!(SubscriptionKind::parse("price"), None);
    }
}
