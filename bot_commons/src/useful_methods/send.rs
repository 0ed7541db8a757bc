use std::time::Duration;

use futures::Future;
use teloxide::{
    payloads::SendMessageSetters,
    requests::Requester,
    sugar::request::{RequestLinkPreviewExt, RequestReplyExt},
    types::{Message, MessageId, Recipient},
    Bot, RequestError,
};

/// Telegram refuses messages longer than this many bytes of text.
pub const MAX_MESSAGE_LEN: usize = 4096;

pub trait BotSendHtml {
    /// Opinionated method to send a message, with HTML markup, no link
    /// previews, and retries due to flood waiting or any other issues.
    /// Text over [`MAX_MESSAGE_LEN`] is cut off.
    fn send_html_retrying<'a>(
        &'a self,
        to_where: impl Into<Recipient> + Send,
        text: &'a str,
        reply_to: Option<MessageId>,
    ) -> impl Future<Output = Result<Message, RequestError>> + Send;
}

impl BotSendHtml for Bot {
    async fn send_html_retrying<'a>(
        &'a self,
        to_where: impl Into<Recipient> + Send,
        text: &'a str,
        reply_to: Option<MessageId>,
    ) -> Result<Message, RequestError> {
        let to_where: Recipient = to_where.into();
        let text = truncate_at_char_boundary(text, MAX_MESSAGE_LEN);

        // Try up to 3 times lol
        let mut looped: u8 = 0;
        loop {
            looped += 1;
            let mut request = self
                .send_message(to_where.clone(), text)
                .parse_mode(teloxide::types::ParseMode::Html)
                .disable_link_preview(true);
            if let Some(reply_to) = reply_to {
                request = request.reply_to(reply_to);
            }
            let result = request.await;

            match result {
                Err(RequestError::RetryAfter(duration)) if looped < 3 => {
                    tokio::time::sleep(duration.duration()).await;
                }
                Err(e) if looped < 3 => {
                    log::debug!("Failed sending a message, retrying: {e}");
                    tokio::time::sleep(Duration::from_secs(1)).await;
                }
                result => break result,
            }
        }
    }
}

/// Cut `text` down to at most `max_len` bytes without splitting a character.
#[must_use]
pub fn truncate_at_char_boundary(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
