use std::sync::Arc;

use bot_commons::useful_methods::BotSendHtml;
use futures::future::BoxFuture;
use teloxide::{
    types::{ChatId, UserId},
    Bot,
};

/// Who a notification is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Audience {
    /// The channel that logs every escalation.
    BlockedActivity,
    /// Each configured administrator, privately.
    Administrators,
}

pub type NotifyError = Box<dyn std::error::Error + Send + Sync>;

/// Delivers HTML formatted notices somewhere humans can read them.
pub trait Notifier: Send + Sync {
    fn notify(&self, audience: Audience, message: String) -> BoxFuture<'_, Result<(), NotifyError>>;
}

/// Send a notification in the background. Failures are only logged.
pub fn dispatch_best_effort(notifier: &Arc<dyn Notifier>, audience: Audience, message: String) {
    let notifier = notifier.clone();
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(audience, message).await {
            log::warn!("Failed to notify {audience:?}: {e}");
        }
    });
}

/// Sends notices through Telegram.
pub struct TelegramNotifier {
    bot: Bot,
    blocked_activity_chat: Option<ChatId>,
    admins: Vec<UserId>,
}

impl TelegramNotifier {
    /// A `blocked_activity_chat` of 0 means there's no such channel.
    pub fn new(bot: Bot, blocked_activity_chat: i64, admins: &[u64]) -> Self {
        TelegramNotifier {
            bot,
            blocked_activity_chat: (blocked_activity_chat != 0)
                .then_some(ChatId(blocked_activity_chat)),
            admins: admins.iter().copied().map(UserId).collect(),
        }
    }

    async fn send(&self, audience: Audience, message: &str) -> Result<(), NotifyError> {
        match audience {
            Audience::BlockedActivity => {
                let Some(chat) = self.blocked_activity_chat else {
                    log::debug!("No blocked activity channel set, dropping: {message}");
                    return Ok(());
                };
                self.bot.send_html_retrying(chat, message, None).await?;
            }
            Audience::Administrators => {
                // Try everyone, report the last failure.
                let mut result = Ok(());
                for admin in &self.admins {
                    if let Err(e) = self.bot.send_html_retrying(ChatId::from(*admin), message, None).await {
                        log::debug!("Couldn't notify admin {admin}: {e}");
                        result = Err(e.into());
                    }
                }
                return result;
            }
        }
        Ok(())
    }
}

impl Notifier for TelegramNotifier {
    fn notify(&self, audience: Audience, message: String) -> BoxFuture<'_, Result<(), NotifyError>> {
        Box::pin(async move { self.send(audience, &message).await })
    }
}
