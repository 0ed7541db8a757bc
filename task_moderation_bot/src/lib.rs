//! Moderation engine for a task board bot, where customers post service
//! requests and workers answer them. Every task description, chat message
//! and photo goes through [`moderation::Moderator`] before anyone sees it.

/// Various types used throughout.
pub mod types;

/// Errors of the moderation engine.
pub mod error;

/// `moderation.json` loading.
pub mod config;

/// Interfaces to the persistent stores the engine depends on.
pub mod stores;

/// SQLite implementation of the stores.
pub mod database;

/// Cached, refreshable snapshot of the word lists.
pub mod word_lists;

/// The moderation engine itself.
pub mod moderation;

/// Best-effort notifications about blocked activity.
pub mod notify;

/// Client for the OCR service that reads text off photos.
pub mod ocr;

/// Functions that handle events from Telegram.
mod handlers;

/// Entry function that starts the bot.
mod entry;
pub use entry::*;
