//! Chat command parsing and dispatch.
//!
//! Every handled command produces exactly one reply. Subscription mutations
//! are restricted to chat administrators; in a private chat the user always
//! administers their own subscriptions.

use crate::db::{Database, DbError};
use crate::gateway::MessagingGateway;
use crate::subscription::SubscriptionKind;
use proposal_core::{normalize, truncate, SymbolError, SymbolToken};
use std::sync::Arc;
use teloxide::utils::command::{BotCommands, ParseError};
use teloxide::utils::html;
use tracing::{error, info, warn};

pub const HELP_TEXT: &str = "🤖 <b>Proposal Bot Help</b>\n\n\
<b>Available commands:</b>\n\
/start - Start the bot\n\
/help - Show this help message\n\
/subscribe [symbols] - Subscribe to proposal updates\n\
/unsubscribe [symbols] - Unsubscribe from proposal updates\n\
/list_subscriptions - List all current subscriptions\n\n\
<b>Examples:</b>\n\
- Subscribe to several tokens: /subscribe $ZRA+0000,$ZIP+0000\n\
- Subscribe to everything: /subscribe all\n\
- Unsubscribe from all: /unsubscribe all\n\n\
<b>Note:</b> symbols use the format $SYMBOL+NNNN. Only group administrators can change a group's subscriptions.";

const UNKNOWN_COMMAND: &str = "❌ Unknown command. Use /help to see available commands.";
const NOT_ADMIN: &str = "❌ This command is only available to group administrators.";
const ADMIN_CHECK_FAILED: &str = "❌ Failed to verify admin status. Please try again later.";
/// Reply length bound, under Telegram's 4096 UTF-16 unit limit.
pub const MAX_REPLY_CHARS: usize = 4000;
const INVALID_SYMBOL_HINT: &str =
    "Please use format $SYMBOL+NNNN (e.g., $ZRA+0000) or 'all'";

/// Commands understood by the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Subscribe(String),
    Unsubscribe(String),
    ListSubscriptions,
    Unknown(String),
}

/// Wire-level command grammar; unknown names surface as `Command::Unknown`.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase")]
enum BotCommand {
    Start,
    Help,
    #[command(aliases = ["proposalsubscribe"])]
    Subscribe(String),
    #[command(aliases = ["proposalunsubscribe"])]
    Unsubscribe(String),
    #[command(
        rename = "list_subscriptions",
        aliases = ["list-subscriptions", "listsubscriptions", "mysubscriptions"]
    )]
    ListSubscriptions,
}

impl From<BotCommand> for Command {
    fn from(command: BotCommand) -> Self {
        match command {
            BotCommand::Start => Command::Start,
            BotCommand::Help => Command::Help,
            BotCommand::Subscribe(args) => Command::Subscribe(args),
            BotCommand::Unsubscribe(args) => Command::Unsubscribe(args),
            BotCommand::ListSubscriptions => Command::ListSubscriptions,
        }
    }
}

impl Command {
    /// Parse a `/command@bot args` message. Command names are
    /// case-insensitive; arguments keep their case.
    ///
    /// Returns `None` for text that is not a command, or for a command
    /// explicitly addressed to a different bot. Without a known bot
    /// username every mention is accepted.
    pub fn parse(text: &str, bot_username: Option<&str>) -> Option<Self> {
        let text = text.trim();
        let (head, args) = match text.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (text, ""),
        };
        let lowered = head.to_lowercase();

        let body = lowered.strip_prefix('/')?;
        let name = body.split_once('@').map_or(body, |(name, _)| name);
        if name.is_empty() {
            return None;
        }

        let (head, me) = match bot_username {
            Some(me) => (lowered.as_str(), me.to_lowercase()),
            None => (
                lowered.split_once('@').map_or(lowered.as_str(), |(head, _)| head),
                String::new(),
            ),
        };

        let parsed = if args.is_empty() {
            BotCommand::parse(head, &me)
        } else {
            BotCommand::parse(&format!("{head} {args}"), &me).or_else(|e| match e {
                // Argument-less commands ignore trailing text
                ParseError::TooManyArguments { .. } => BotCommand::parse(head, &me),
                e => Err(e),
            })
        };

        match parsed {
            Ok(command) => Some(command.into()),
            Err(ParseError::WrongBotName(_)) => None,
            Err(_) => Some(Command::Unknown(name.to_string())),
        }
    }

    /// Whether the command mutates subscriptions and needs admin rights.
    pub fn is_restricted(&self) -> bool {
        matches!(self, Command::Subscribe(_) | Command::Unsubscribe(_))
    }
}

/// Where a command came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandOrigin {
    pub chat_id: i64,
    pub user_id: i64,
}

impl CommandOrigin {
    /// One-to-one chats share their id with the user.
    pub fn is_private(&self) -> bool {
        self.chat_id == self.user_id
    }
}

/// Routes commands to subscription store operations and replies.
pub struct CommandRouter {
    db: Database,
    gateway: Arc<dyn MessagingGateway>,
    kind: SubscriptionKind,
}

impl CommandRouter {
    pub fn new(db: Database, gateway: Arc<dyn MessagingGateway>) -> Self {
        Self {
            db,
            gateway,
            kind: SubscriptionKind::Proposal,
        }
    }

    /// Handle one command and send its single reply. Returns the reply text.
    pub async fn handle(&self, origin: CommandOrigin, command: Command) -> String {
        let reply = truncate(&self.reply_for(origin, &command).await, MAX_REPLY_CHARS);

        if let Err(e) = self.gateway.deliver(origin.chat_id, &reply).await {
            error!(chat_id = origin.chat_id, error = %e, "Failed to send reply");
        }
        reply
    }

    async fn reply_for(&self, origin: CommandOrigin, command: &Command) -> String {
        if command.is_restricted() {
            if let Some(denial) = self.check_admin(origin).await {
                return denial;
            }
        }

        match command {
            Command::Start | Command::Help => HELP_TEXT.to_string(),
            Command::Subscribe(args) => self.subscribe(origin.chat_id, args).await,
            Command::Unsubscribe(args) => self.unsubscribe(origin.chat_id, args).await,
            Command::ListSubscriptions => self.list_subscriptions(origin.chat_id).await,
            Command::Unknown(name) => {
                info!(chat_id = origin.chat_id, command = %name, "Unknown command");
                UNKNOWN_COMMAND.to_string()
            }
        }
    }

    /// Returns a denial reply when the caller may not mutate subscriptions.
    async fn check_admin(&self, origin: CommandOrigin) -> Option<String> {
        if origin.is_private() {
            return None;
        }
        match self.gateway.is_chat_admin(origin.chat_id, origin.user_id).await {
            Ok(true) => None,
            Ok(false) => {
                info!(
                    chat_id = origin.chat_id,
                    user_id = origin.user_id,
                    "Restricted command from non-admin"
                );
                Some(NOT_ADMIN.to_string())
            }
            Err(e) => {
                warn!(chat_id = origin.chat_id, error = %e, "Error checking admin status");
                Some(ADMIN_CHECK_FAILED.to_string())
            }
        }
    }

    async fn subscribe(&self, chat_id: i64, args: &str) -> String {
        let tokens = match parse_symbols(args) {
            Ok(tokens) => tokens,
            Err(SymbolError::Empty) => {
                return "Please provide a symbol to subscribe to (e.g., /subscribe $ZRA+0000 \
                        or /subscribe $ZRA+0000,$ZIP+0000)"
                    .to_string()
            }
            Err(e) => return invalid_symbol_reply(&e),
        };

        if tokens.iter().any(SymbolToken::is_all) {
            return match self.db.subscribe_all(chat_id, self.kind).await {
                Ok(_) => "✅ Subscribed to all proposals.".to_string(),
                Err(e) => {
                    error!(chat_id, error = %e, "Failed to subscribe to all");
                    "❌ Failed to subscribe. Please try again later.".to_string()
                }
            };
        }

        let mut succeeded = Vec::new();
        let mut failures = Vec::new();
        for token in &tokens {
            match self.db.subscribe(chat_id, self.kind, token).await {
                Ok(_) => succeeded.push(token),
                Err(e) => {
                    error!(chat_id, symbol = %token, error = %e, "Failed to subscribe");
                    failures.push(format!(
                        "❌ Failed to subscribe to {}: {}",
                        html::escape(token.as_str()),
                        failure_reason(&e)
                    ));
                }
            }
        }

        summarize(&succeeded, failures, "subscribed to")
    }

    async fn unsubscribe(&self, chat_id: i64, args: &str) -> String {
        let tokens = match parse_symbols(args) {
            Ok(tokens) => tokens,
            Err(SymbolError::Empty) => {
                return "Please provide a symbol to unsubscribe from (e.g., /unsubscribe \
                        $ZRA+0000 or /unsubscribe $ZRA+0000,$ZIP+0000)"
                    .to_string()
            }
            Err(e) => return invalid_symbol_reply(&e),
        };

        if tokens.iter().any(SymbolToken::is_all) {
            return match self.db.unsubscribe_all(chat_id, self.kind).await {
                Ok(removed) => format!("✅ Unsubscribed from all proposals ({removed} removed)."),
                Err(e) => {
                    error!(chat_id, error = %e, "Failed to unsubscribe from all");
                    "❌ Failed to unsubscribe. Please try again later.".to_string()
                }
            };
        }

        let mut succeeded = Vec::new();
        let mut failures = Vec::new();
        for token in &tokens {
            match self.db.unsubscribe(chat_id, self.kind, token).await {
                Ok(()) => succeeded.push(token),
                Err(e) => {
                    if !e.is_not_found() {
                        error!(chat_id, symbol = %token, error = %e, "Failed to unsubscribe");
                    }
                    failures.push(format!(
                        "❌ Failed to unsubscribe from {}: {}",
                        html::escape(token.as_str()),
                        failure_reason(&e)
                    ));
                }
            }
        }

        summarize(&succeeded, failures, "unsubscribed from")
    }

    async fn list_subscriptions(&self, chat_id: i64) -> String {
        let subs = match self.db.list_subscriptions(chat_id).await {
            Ok(subs) => subs,
            Err(e) => {
                error!(chat_id, error = %e, "Failed to list subscriptions");
                return "❌ Failed to list subscriptions. Please try again later.".to_string();
            }
        };

        if subs.is_empty() {
            return "You are not subscribed to any proposals yet.\n\
                    Use /subscribe [symbols] to subscribe."
                .to_string();
        }

        let header = format!("📋 Your subscriptions ({}):", subs.len());
        let lines: Vec<String> = subs
            .iter()
            .map(|sub| format!("• {} ({})", html::escape(&sub.symbol), sub.kind))
            .collect();
        let budget = MAX_REPLY_CHARS - header.chars().count() - 1;
        format!("{header}\n{}", join_bounded(&lines, budget))
    }
}

/// Normalize and de-duplicate, keeping first-seen order.
fn parse_symbols(args: &str) -> Result<Vec<SymbolToken>, SymbolError> {
    let mut tokens = normalize(args)?;
    let mut seen = std::collections::HashSet::new();
    tokens.retain(|t| seen.insert(t.clone()));
    Ok(tokens)
}

fn invalid_symbol_reply(err: &SymbolError) -> String {
    format!("❌ {}. {INVALID_SYMBOL_HINT}", html::escape(&capitalize(&err.to_string())))
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn failure_reason(err: &DbError) -> &'static str {
    match err {
        DbError::NotFound { .. } => "not subscribed",
        _ => "temporarily unavailable, please try again later",
    }
}

/// Single reply body: success line first, then one line per failure.
fn summarize(succeeded: &[&SymbolToken], failures: Vec<String>, verb: &str) -> String {
    let mut lines = Vec::with_capacity(failures.len() + 1);
    match succeeded {
        [] => {}
        [only] => lines.push(format!("✅ Successfully {verb} {}", html::escape(only.as_str()))),
        many => lines.push(format!("✅ Successfully {verb} {} symbols", many.len())),
    }
    lines.extend(failures);
    join_bounded(&lines, MAX_REPLY_CHARS)
}

/// Join `lines` with newlines within `budget` characters. Lines that do not
/// fit are replaced by a count of the omitted ones.
fn join_bounded(lines: &[String], budget: usize) -> String {
    const OMITTED_RESERVE: usize = 32;

    let total = lines.iter().map(|l| l.chars().count() + 1).sum::<usize>();
    if total <= budget + 1 {
        return lines.join("\n");
    }

    let limit = budget.saturating_sub(OMITTED_RESERVE);
    let mut out = String::new();
    let mut used = 0;
    for (i, line) in lines.iter().enumerate() {
        let cost = line.chars().count() + usize::from(i > 0);
        if used + cost > limit {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&format!("…and {} more", lines.len() - i));
            break;
        }
        if i > 0 {
            out.push('\n');
        }
        out.push_str(line);
        used += cost;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::testing::RecordingGateway;
    use pretty_assertions::assert_eq;

    const USER: i64 = 100;
    const GROUP: i64 = -500;

    fn private() -> CommandOrigin {
        CommandOrigin { chat_id: USER, user_id: USER }
    }

    fn group() -> CommandOrigin {
        CommandOrigin { chat_id: GROUP, user_id: USER }
    }

    async fn router_with(gateway: RecordingGateway) -> (CommandRouter, Arc<RecordingGateway>, Database) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        let gateway = Arc::new(gateway);
        let router = CommandRouter::new(db.clone(), gateway.clone());
        (router, gateway, db)
    }

    async fn symbols_of(db: &Database, chat_id: i64) -> Vec<String> {
        db.list_subscriptions(chat_id)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.symbol)
            .collect()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("/start", None), Some(Command::Start));
        assert_eq!(Command::parse("/HELP", None), Some(Command::Help));
        assert_eq!(
            Command::parse("/subscribe  $zra+0001, $eth+0002 ", None),
            Some(Command::Subscribe("$zra+0001, $eth+0002".to_string()))
        );
        assert_eq!(
            Command::parse("/proposalUnsubscribe all", None),
            Some(Command::Unsubscribe("all".to_string()))
        );
        assert_eq!(
            Command::parse("/list-subscriptions", None),
            Some(Command::ListSubscriptions)
        );
        assert_eq!(
            Command::parse("/mySubscriptions", None),
            Some(Command::ListSubscriptions)
        );
        assert_eq!(
            Command::parse("/dance", None),
            Some(Command::Unknown("dance".to_string()))
        );
        assert_eq!(Command::parse("hello", None), None);
        assert_eq!(Command::parse("/", None), None);
    }

    #[test]
    fn test_parse_respects_bot_mention() {
        assert_eq!(
            Command::parse("/help@ProposalBot", Some("proposalbot")),
            Some(Command::Help)
        );
        assert_eq!(Command::parse("/help@OtherBot", Some("proposalbot")), None);
        assert_eq!(Command::parse("/help@OtherBot", None), Some(Command::Help));
        assert_eq!(Command::parse("/dance@OtherBot", Some("proposalbot")), None);
        assert_eq!(
            Command::parse("/Subscribe@proposalbot $Zra+0001", Some("ProposalBot")),
            Some(Command::Subscribe("$Zra+0001".to_string()))
        );
    }

    #[test]
    fn test_argument_less_commands_ignore_trailing_text() {
        assert_eq!(Command::parse("/help me please", None), Some(Command::Help));
        assert_eq!(
            Command::parse("/list_subscriptions now", None),
            Some(Command::ListSubscriptions)
        );
    }

    #[test]
    fn test_join_bounded() {
        let lines: Vec<String> = (0..10).map(|i| format!("line {i}")).collect();
        assert_eq!(join_bounded(&lines[..2], 100), "line 0\nline 1");

        let many: Vec<String> = (0..100).map(|i| format!("{i:0>20}")).collect();
        let joined = join_bounded(&many, 500);
        assert!(joined.chars().count() <= 500);
        assert!(joined.ends_with("more"));
        let shown = joined.lines().count() - 1;
        assert!(joined.ends_with(&format!("…and {} more", 100 - shown)));
    }

    #[test]
    fn test_restricted_commands() {
        assert!(Command::Subscribe(String::new()).is_restricted());
        assert!(Command::Unsubscribe(String::new()).is_restricted());
        assert!(!Command::ListSubscriptions.is_restricted());
        assert!(!Command::Help.is_restricted());
        assert!(!Command::Unknown("x".into()).is_restricted());
    }

    #[tokio::test]
    async fn test_subscribe_then_all_scenario() {
        let (router, gateway, db) = router_with(RecordingGateway::default()).await;

        let reply = router
            .handle(private(), Command::Subscribe("$zra+0001, $eth+0002".into()))
            .await;
        assert_eq!(reply, "✅ Successfully subscribed to 2 symbols");
        assert_eq!(symbols_of(&db, USER).await, vec!["$ETH+0002", "$ZRA+0001"]);

        let reply = router.handle(private(), Command::Subscribe("all".into())).await;
        assert_eq!(reply, "✅ Subscribed to all proposals.");
        assert_eq!(symbols_of(&db, USER).await, vec!["all"]);

        assert_eq!(gateway.texts_to(USER).len(), 2);
    }

    #[tokio::test]
    async fn test_single_symbol_reply_names_symbol() {
        let (router, _, _) = router_with(RecordingGateway::default()).await;
        let reply = router.handle(private(), Command::Subscribe("$zip+0000".into())).await;
        assert_eq!(reply, "✅ Successfully subscribed to $ZIP+0000");
    }

    #[tokio::test]
    async fn test_invalid_symbol_rejects_whole_batch() {
        let (router, gateway, db) = router_with(RecordingGateway::default()).await;

        let reply = router
            .handle(private(), Command::Subscribe("$zra+0001, zra".into()))
            .await;
        assert!(reply.starts_with("❌ Invalid symbol format: zra."));
        assert!(symbols_of(&db, USER).await.is_empty());
        assert_eq!(gateway.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_args_reply_with_usage() {
        let (router, gateway, _) = router_with(RecordingGateway::default()).await;

        let reply = router.handle(private(), Command::Subscribe("  ".into())).await;
        assert!(reply.starts_with("Please provide a symbol to subscribe to"));
        let reply = router.handle(private(), Command::Unsubscribe(String::new())).await;
        assert!(reply.starts_with("Please provide a symbol to unsubscribe from"));
        assert_eq!(gateway.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_non_admin_in_group_is_denied_without_mutation() {
        let (router, gateway, db) = router_with(RecordingGateway::default()).await;

        let reply = router.handle(group(), Command::Subscribe("$zra+0001".into())).await;
        assert_eq!(reply, NOT_ADMIN);
        let reply = router.handle(group(), Command::Unsubscribe("all".into())).await;
        assert_eq!(reply, NOT_ADMIN);

        assert!(symbols_of(&db, GROUP).await.is_empty());
        assert_eq!(gateway.texts_to(GROUP), vec![NOT_ADMIN, NOT_ADMIN]);
    }

    #[tokio::test]
    async fn test_group_admin_may_subscribe() {
        let gateway = RecordingGateway {
            admins: [(GROUP, USER)].into(),
            ..Default::default()
        };
        let (router, _, db) = router_with(gateway).await;

        router.handle(group(), Command::Subscribe("$zra+0001".into())).await;
        assert_eq!(symbols_of(&db, GROUP).await, vec!["$ZRA+0001"]);
    }

    #[tokio::test]
    async fn test_admin_lookup_failure_denies() {
        let gateway = RecordingGateway {
            admin_lookup_fails: true,
            ..Default::default()
        };
        let (router, gateway, db) = router_with(gateway).await;

        let reply = router.handle(group(), Command::Subscribe("$zra+0001".into())).await;
        assert_eq!(reply, ADMIN_CHECK_FAILED);
        assert!(symbols_of(&db, GROUP).await.is_empty());
        assert_eq!(gateway.sent().len(), 1);

        // Private chats never consult the gateway
        router.handle(private(), Command::Subscribe("$zra+0001".into())).await;
        assert_eq!(symbols_of(&db, USER).await, vec!["$ZRA+0001"]);
    }

    #[tokio::test]
    async fn test_unrestricted_commands_skip_admin_check() {
        let (router, gateway, _) = router_with(RecordingGateway::default()).await;

        assert_eq!(router.handle(group(), Command::Help).await, HELP_TEXT);
        assert_eq!(router.handle(group(), Command::Start).await, HELP_TEXT);
        let reply = router.handle(group(), Command::ListSubscriptions).await;
        assert!(reply.starts_with("You are not subscribed"));
        assert_eq!(
            router.handle(group(), Command::Unknown("dance".into())).await,
            UNKNOWN_COMMAND
        );
        assert_eq!(gateway.texts_to(GROUP).len(), 4);
    }

    #[tokio::test]
    async fn test_unsubscribe_partial_failure_summary() {
        let (router, gateway, db) = router_with(RecordingGateway::default()).await;
        router
            .handle(private(), Command::Subscribe("$zra+0001,$eth+0002".into()))
            .await;

        let reply = router
            .handle(private(), Command::Unsubscribe("$zra+0001, $btc+0003".into()))
            .await;
        assert_eq!(
            reply,
            "✅ Successfully unsubscribed from $ZRA+0001\n\
             ❌ Failed to unsubscribe from $BTC+0003: not subscribed"
        );
        assert_eq!(symbols_of(&db, USER).await, vec!["$ETH+0002"]);
        assert_eq!(gateway.texts_to(USER).len(), 2);
    }

    #[tokio::test]
    async fn test_unsubscribe_all_reports_count() {
        let (router, _, db) = router_with(RecordingGateway::default()).await;
        router
            .handle(private(), Command::Subscribe("$zra+0001,$eth+0002".into()))
            .await;

        let reply = router.handle(private(), Command::Unsubscribe("ALL".into())).await;
        assert_eq!(reply, "✅ Unsubscribed from all proposals (2 removed).");
        assert!(symbols_of(&db, USER).await.is_empty());
    }

    #[tokio::test]
    async fn test_list_subscriptions_newest_first() {
        let (router, _, _) = router_with(RecordingGateway::default()).await;
        router
            .handle(private(), Command::Subscribe("$zra+0001,$eth+0002".into()))
            .await;

        let reply = router.handle(private(), Command::ListSubscriptions).await;
        assert_eq!(
            reply,
            "📋 Your subscriptions (2):\n• $ETH+0002 (proposal)\n• $ZRA+0001 (proposal)"
        );
    }

    #[tokio::test]
    async fn test_duplicate_symbols_collapse() {
        let (router, _, db) = router_with(RecordingGateway::default()).await;
        let reply = router
            .handle(private(), Command::Subscribe("$zra+0001, $ZRA+0001".into()))
            .await;
        assert_eq!(reply, "✅ Successfully subscribed to $ZRA+0001");
        assert_eq!(symbols_of(&db, USER).await.len(), 1);
    }

    fn telegram_sized() -> RecordingGateway {
        RecordingGateway {
            max_chars: Some(4096),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_long_subscription_list_still_replies() {
        let (router, gateway, db) = router_with(telegram_sized()).await;
        for i in 0..300 {
            let token: SymbolToken = format!("$ABCD+{i:04}").parse().unwrap();
            db.subscribe(USER, SubscriptionKind::Proposal, &token).await.unwrap();
        }

        let reply = router.handle(private(), Command::ListSubscriptions).await;
        assert!(reply.starts_with("📋 Your subscriptions (300):"));
        assert!(reply.chars().count() <= MAX_REPLY_CHARS);
        assert!(reply.ends_with("more"));
        assert_eq!(gateway.texts_to(USER), vec![reply]);
    }

    #[tokio::test]
    async fn test_large_failed_batch_still_replies() {
        let (router, gateway, _) = router_with(telegram_sized()).await;
        let batch: Vec<String> = (0..300).map(|i| format!("$ABCD+{i:04}")).collect();

        let reply = router
            .handle(private(), Command::Unsubscribe(batch.join(",")))
            .await;
        assert!(reply.starts_with("❌ Failed to unsubscribe from $ABCD+0000: not subscribed"));
        assert!(reply.chars().count() <= MAX_REPLY_CHARS);
        assert_eq!(gateway.texts_to(USER).len(), 1);
    }

    #[tokio::test]
    async fn test_reply_failure_is_swallowed() {
        let gateway = RecordingGateway {
            unreachable: [USER].into(),
            ..Default::default()
        };
        let (router, _, db) = router_with(gateway).await;

        router.handle(private(), Command::Subscribe("$zra+0001".into())).await;
        assert_eq!(symbols_of(&db, USER).await, vec!["$ZRA+0001"]);
    }
}
