//! Telegram notifications for governance proposals.
//!
//! This crate provides:
//! - SQLite-based subscription storage
//! - Telegram bot integration for notifications and commands
//! - Fan-out of proposal notifications to subscribed chats

pub mod commands;
pub mod db;
pub mod gateway;
pub mod notifier;
pub mod subscription;
pub mod telegram;

pub use commands::{Command, CommandOrigin, CommandRouter};
pub use db::{Database, DbError};
pub use gateway::{GatewayError, MessageFormat, MessagingGateway};
pub use notifier::{FanoutSummary, Notifier, NotifierConfig, NotifierError};
pub use subscription::{Subscription, SubscriptionKind};
pub use telegram::{format_proposal_message, TelegramBot};
