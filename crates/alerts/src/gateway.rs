//! Outbound messaging abstraction.
//!
//! The notifier and command router only talk to chats through
//! [`MessagingGateway`]; [`crate::telegram::TelegramBot`] is the production
//! implementation.

use async_trait::async_trait;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Telegram API error: {0}")]
    Api(#[from] teloxide::RequestError),
    #[error("Delivery rejected: {0}")]
    Rejected(String),
}

/// How the gateway should interpret message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFormat {
    Html,
    Plain,
}

#[async_trait]
pub trait MessagingGateway: Send + Sync {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        format: MessageFormat,
    ) -> Result<(), GatewayError>;

    /// Whether `user_id` administers `chat_id`.
    async fn is_chat_admin(&self, chat_id: i64, user_id: i64) -> Result<bool, GatewayError>;

    /// Send as HTML, falling back to plain text if the formatted send is
    /// rejected.
    async fn deliver(&self, chat_id: i64, text: &str) -> Result<(), GatewayError> {
        if let Err(e) = self.send_message(chat_id, text, MessageFormat::Html).await {
            warn!(chat_id, error = %e, "Formatted send failed, retrying as plain text");
            self.send_message(chat_id, &html_to_plain(text), MessageFormat::Plain)
                .await?;
        }
        Ok(())
    }
}

/// Strip tags and decode the entities our HTML messages use.
pub fn html_to_plain(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        match rest[start..].find('>') {
            Some(end) => rest = &rest[start + end + 1..],
            None => break,
        }
    }
    // An unclosed `<` is kept as text
    if let Some(start) = rest.find('<') {
        out.push_str(&rest[start..]);
    } else {
        out.push_str(rest);
    }

    out.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
