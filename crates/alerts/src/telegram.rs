//! Telegram bot: message delivery and command intake.

use crate::commands::{Command, CommandOrigin, CommandRouter};
use crate::gateway::{GatewayError, MessageFormat, MessagingGateway};
use async_trait::async_trait;
use proposal_core::ProposalNotice;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::types::{ParseMode, UserId};
use teloxide::utils::html;
use tracing::{debug, info, warn};

/// Telegram bot wrapper.
pub struct TelegramBot {
    bot: Bot,
}

impl TelegramBot {
    /// Create a new bot with the given token.
    pub fn new(token: &str) -> Self {
        let bot = Bot::new(token);
        Self { bot }
    }

    /// Receive updates and feed commands to `router` until the task is
    /// cancelled. Each chat's updates are handled on their own task.
    pub async fn run(self: Arc<Self>, router: Arc<CommandRouter>) {
        let username = match self.bot.get_me().await {
            Ok(me) => {
                info!(username = ?me.user.username, "Authorized on Telegram");
                me.user.username.clone()
            }
            Err(e) => {
                warn!(error = %e, "Failed to fetch bot identity; accepting all command mentions");
                None
            }
        };

        let handler = Update::filter_message().endpoint(move |msg: Message| {
            let router = Arc::clone(&router);
            let username = username.clone();
            async move {
                handle_message(&router, &msg, username.as_deref()).await;
                Ok::<(), GatewayError>(())
            }
        });

        Dispatcher::builder(self.bot.clone(), handler)
            .build()
            .dispatch()
            .await;
    }
}

async fn handle_message(router: &CommandRouter, msg: &Message, bot_username: Option<&str>) {
    let Some(text) = msg.text() else {
        return;
    };
    let Some(command) = Command::parse(text, bot_username) else {
        return;
    };
    let Some(user) = msg.from.as_ref() else {
        debug!(chat_id = msg.chat.id.0, "Command without sender ignored");
        return;
    };

    let origin = CommandOrigin {
        chat_id: msg.chat.id.0,
        user_id: user.id.0 as i64,
    };
    info!(
        chat_id = origin.chat_id,
        username = ?user.username,
        ?command,
        "Received command"
    );
    router.handle(origin, command).await;
}

#[async_trait]
impl MessagingGateway for TelegramBot {
    async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        format: MessageFormat,
    ) -> Result<(), GatewayError> {
        let request = self.bot.send_message(ChatId(chat_id), text);
        match format {
            MessageFormat::Html => request.parse_mode(ParseMode::Html).await?,
            MessageFormat::Plain => request.await?,
        };
        Ok(())
    }

    async fn is_chat_admin(&self, chat_id: i64, user_id: i64) -> Result<bool, GatewayError> {
        let user_id = u64::try_from(user_id)
            .map_err(|_| GatewayError::Rejected(format!("invalid user id {user_id}")))?;
        let member = self
            .bot
            .get_chat_member(ChatId(chat_id), UserId(user_id))
            .await?;
        Ok(member.is_privileged())
    }
}

/// Format a surfaced proposal as an HTML notification.
pub fn format_proposal_message(notice: &ProposalNotice, explorer_url: &str) -> String {
    let link = format!(
        "{}/{}",
        explorer_url.trim_end_matches('/'),
        notice.proposal_id
    );

    let mut msg = format!(
        "🗳 <b>New Governance Proposal</b>\n\n\
         <b>Symbol:</b> {}\n\
         <b>Title:</b> {}",
        html::escape(&notice.symbol),
        html::escape(&notice.title),
    );

    if !notice.synopsis.is_empty() {
        msg.push_str(&format!(
            "\n\n<b>Synopsis:</b>\n{}",
            html::escape(&notice.synopsis)
        ));
    }

    msg.push_str(&format!(
        "\n\n<b>Proposal ID:</b> <code>{}</code>\n🔗 <a href=\"{}\">View on explorer</a>",
        notice.proposal_id,
        html::escape(&link)
    ));

    let now = chrono::Utc::now();
    msg.push_str(&format!("\n\n⏰ {}", now.format("%Y-%m-%d %H:%M:%S UTC")));

    msg
}
