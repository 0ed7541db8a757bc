use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use bot_commons::useful_methods::{BotSendHtml, BotStuff, MessageStuff};
use chrono::Utc;
use html_escape::encode_text;
use teloxide::{
    prelude::*,
    types::{BotCommand, Me},
    RequestError,
};

use crate::{
    config::Config,
    error::ModerationError,
    moderation::Moderator,
    types::{Category, Consequence, Context, ModerationVerdict},
};

/// Photos bigger than this aren't read.
const MAX_PHOTO_BYTES: u32 = 10 * 1024 * 1024;

const UNAVAILABLE: &str = "Moderation is unavailable right now, please try again later.";

/// Commands shown in the Telegram menu, with their descriptions.
const COMMANDS: &[(&str, &str)] = &[
    ("task", "Post a task: /task <description>"),
    ("ban_status", "Check whether you are suspended or warned"),
    ("words", "Admins: show a word list"),
    ("add_word", "Admins: add a word to a word list"),
    ("del_word", "Admins: remove a word from a word list"),
    ("help", "How to use this bot"),
];

pub fn generate_bot_commands() -> Vec<BotCommand> {
    COMMANDS
        .iter()
        .map(|(command, description)| BotCommand::new(*command, *description))
        .collect()
}

/// The last accepted task of each user, to catch resubmissions. Holds at
/// most `capacity` users; past that, whoever posted longest ago is forgotten.
pub struct LastTasks {
    tasks: Mutex<LastTasksInner>,
    capacity: usize,
}

#[derive(Default)]
struct LastTasksInner {
    by_user: HashMap<UserId, (u64, String)>,
    counter: u64,
}

impl Default for LastTasks {
    fn default() -> Self {
        LastTasks::with_capacity(4096)
    }
}

impl LastTasks {
    pub fn with_capacity(capacity: usize) -> Self {
        LastTasks {
            tasks: Mutex::default(),
            capacity: capacity.max(1),
        }
    }

    fn get(&self, user: UserId) -> Option<String> {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .by_user
            .get(&user)
            .map(|(_, text)| text.clone())
    }

    fn set(&self, user: UserId, text: &str) {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);

        if !tasks.by_user.contains_key(&user) && tasks.by_user.len() >= self.capacity {
            let oldest = tasks
                .by_user
                .iter()
                .min_by_key(|(_, (seq, _))| *seq)
                .map(|(user, _)| *user);
            if let Some(oldest) = oldest {
                tasks.by_user.remove(&oldest);
            }
        }

        tasks.counter += 1;
        let seq = tasks.counter;
        tasks.by_user.insert(user, (seq, text.to_string()));
    }
}

pub async fn handle_message(
    bot: Bot,
    me: Me,
    message: Message,
    moderator: Arc<Moderator>,
    config: Arc<Config>,
    last_tasks: Arc<LastTasks>,
) -> Result<(), RequestError> {
    let Some(user) = &message.from else {
        return Ok(());
    };
    if user.is_bot {
        return Ok(());
    }
    let user_id = user.id;

    // Edits don't re-run commands, or editing a task would be a resubmission.
    if message.edit_date().is_none()
        && handle_command(&bot, &me, &message, &moderator, &config, &last_tasks).await?
    {
        return Ok(());
    }

    let context = match message.chat.is_private() {
        true => Context::PersonalMessage,
        false => Context::ChatMessage,
    };

    let mut verdict = match message.text_full() {
        Some(text) => {
            moderator
                .evaluate(text_to_moderate(text), context, user_id)
                .await
        }
        None => Ok(ModerationVerdict::allowed()),
    };

    if matches!(&verdict, Ok(v) if v.allowed) {
        if let Some(photo) = message.find_biggest_photo() {
            let mut image = Vec::new();
            match bot
                .download_file_to_vec(&photo.file, &mut image, MAX_PHOTO_BYTES)
                .await
            {
                Ok(true) => verdict = moderator.evaluate_photo(image, user_id).await,
                Ok(false) => log::debug!("Photo from {user_id} is too big to check"),
                Err(e) => log::warn!("Failed to download a photo from {user_id}: {e}"),
            }
        }
    }

    match verdict {
        Ok(verdict) if verdict.allowed => Ok(()),
        Ok(verdict) => {
            let reason = verdict.reason.as_deref().unwrap_or("Not allowed.");
            // Users who are already blocked don't get a notice per message.
            let quiet = matches!(
                verdict.consequence,
                Consequence::StillSuspended { .. } | Consequence::AlreadyPermanent
            );
            refuse(&bot, &message, reason, quiet).await
        }
        Err(e) => {
            log::error!("Couldn't moderate a message from {user_id}: {e}");
            refuse(&bot, &message, UNAVAILABLE, false).await
        }
    }
}

/// The part of a message that gets moderated. A leading `/command` or
/// `/command@some_bot` token is left out.
fn text_to_moderate(text: &str) -> &str {
    let Some(rest) = text.strip_prefix('/') else {
        return text;
    };
    let token_len = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let is_command = rest[..token_len]
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '@');
    match is_command {
        true => rest[token_len..].trim(),
        false => text,
    }
}

/// Take down a message. In private chats there's nothing to take down from
/// others, so the sender just gets told. A `quiet` removal posts nothing in
/// groups.
async fn refuse(
    bot: &Bot,
    message: &Message,
    reason: &str,
    quiet: bool,
) -> Result<(), RequestError> {
    let reason = encode_text(reason);

    if message.chat.is_private() {
        bot.send_html_retrying(message.chat.id, &reason, Some(message.id))
            .await?;
        return Ok(());
    }

    match bot.delete_message(message.chat.id, message.id).await {
        Ok(_) if quiet => {}
        Ok(_) => {
            let name = match &message.from {
                Some(user) => match &user.username {
                    Some(username) => format!("@{username}"),
                    None => user.full_name(),
                },
                None => "a user".to_string(),
            };
            let text = format!(
                "Removed a message from {}. {reason}",
                encode_text(&name)
            );
            bot.send_html_retrying(message.chat.id, &text, None).await?;
        }
        Err(e) => {
            log::warn!("Failed to remove a message in {}: {e}", message.chat.id);
        }
    }
    Ok(())
}

/// Split `/command@bot_name params` into the lowercased command and its
/// parameters.
fn split_command<'a>(text: &'a str, bot_username: &str) -> Option<(String, &'a str)> {
    if !text.starts_with('/') {
        return None;
    }
    let command = text.split_whitespace().next()?;
    let params = text[command.len()..].trim();
    let username = format!("@{bot_username}");
    let command = command.trim_end_matches(username.as_str()).to_lowercase();
    Some((command, params))
}

/// Returns `true` if a command was parsed and responded to.
async fn handle_command(
    bot: &Bot,
    me: &Me,
    message: &Message,
    moderator: &Moderator,
    config: &Config,
    last_tasks: &LastTasks,
) -> Result<bool, RequestError> {
    let Some(text) = message.text() else {
        return Ok(false);
    };
    let Some((command, params)) = split_command(text, me.username()) else {
        return Ok(false);
    };
    let Some(user) = &message.from else {
        return Ok(false);
    };

    let response = match command.as_str() {
        "/start" | "/help" if message.chat.is_private() => help_text(),
        "/task" => post_task(moderator, last_tasks, user.id, params).await,
        "/ban_status" => match moderator.ban_status(user.id, Utc::now()).await {
            Ok(status) => status.to_string(),
            Err(e) => {
                log::error!("Couldn't get ban status of {}: {e}", user.id);
                UNAVAILABLE.to_string()
            }
        },
        "/words" | "/add_word" | "/del_word" if !config.is_admin(user.id) => {
            "Only administrators can do that.".to_string()
        }
        "/words" | "/add_word" | "/del_word" => {
            match edit_word_list(moderator, &command, params).await {
                Ok(response) => response,
                Err(e) => {
                    log::error!("Word list command {command} failed: {e}");
                    UNAVAILABLE.to_string()
                }
            }
        }
        _ => return Ok(false),
    };

    bot.send_html_retrying(message.chat.id, &response, Some(message.id))
        .await?;
    Ok(true)
}

fn help_text() -> String {
    let mut text = String::from(
        "This bot checks tasks and messages on the board.\n\n\
         Tasks and messages must not contain contacts, links, foreign letters or \
         rude words. Breaking the rules gets you suspended for a day, and \
         repeated violations get you banned.\n\n",
    );
    for (command, description) in COMMANDS {
        text.push_str(&format!("/{command} - {}\n", encode_text(description)));
    }
    text
}

async fn post_task(
    moderator: &Moderator,
    last_tasks: &LastTasks,
    user_id: UserId,
    text: &str,
) -> String {
    if text.is_empty() {
        return "Write the task after the command: /task &lt;description&gt;".to_string();
    }

    let result: Result<String, ModerationError> = async {
        let verdict = moderator.evaluate(text, Context::Task, user_id).await?;
        if !verdict.allowed {
            return Ok(encode_text(verdict.reason.as_deref().unwrap_or("Not allowed.")).into());
        }

        if let Some(previous) = last_tasks.get(user_id) {
            let verdict = moderator
                .check_resubmission(&previous, text, user_id)
                .await?;
            if !verdict.allowed {
                return Ok(encode_text(verdict.reason.as_deref().unwrap_or("Not allowed.")).into());
            }
        }

        last_tasks.set(user_id, text);
        Ok("Task accepted.".to_string())
    }
    .await;

    result.unwrap_or_else(|e| {
        log::error!("Couldn't check a task from {user_id}: {e}");
        UNAVAILABLE.to_string()
    })
}

/// `/words <category>`, `/add_word <category> <word>` and
/// `/del_word <category> <word>`.
async fn edit_word_list(
    moderator: &Moderator,
    command: &str,
    params: &str,
) -> Result<String, ModerationError> {
    let (category, word) = match params.split_once(char::is_whitespace) {
        Some((category, word)) => (category, word.trim()),
        None => (params, ""),
    };

    let Ok(category) = category.parse::<Category>() else {
        let names: Vec<&str> = Category::ALL.iter().map(Category::as_str).collect();
        return Ok(format!("Categories: {}", names.join(", ")));
    };

    let word_lists = moderator.word_lists();
    let response = match command {
        "/words" => {
            let words = word_lists.list(category).await?;
            match words.is_empty() {
                true => format!("{category} is empty."),
                false => format!("{category}: {}", encode_text(&words.join(", "))),
            }
        }
        _ if word.is_empty() => format!("Which word? {command} {category} &lt;word&gt;"),
        "/add_word" => match word_lists.insert(category, word).await? {
            true => format!("Added to {category}."),
            false => format!("Already in {category}."),
        },
        _ => match word_lists.delete(category, word).await? {
            true => format!("Removed from {category}."),
            false => format!("Not in {category}."),
        },
    };
    Ok(response)
}
