use std::sync::Arc;

use bot_commons::read_bot_key;
use teloxide::{dptree::deps, prelude::*};

use crate::{
    config::Config,
    database::Database,
    handlers::{generate_bot_commands, handle_message, LastTasks},
    moderation::Moderator,
    notify::{Notifier, TelegramNotifier},
    ocr::{HttpOcr, OcrService},
    word_lists::WordLists,
};

const CONFIG_PATH: &str = "moderation.json";

/// # Panics
///
/// Panics if there's no key file, the config is broken or the database
/// can't be opened.
pub async fn entry() {
    let config = Arc::new(Config::load(CONFIG_PATH).expect("Could not load config!"));

    let bot = Bot::new(read_bot_key().expect("Could not load bot key file!"));

    bot.set_my_commands(generate_bot_commands())
        .await
        .expect("Failed to set bot commands!");

    let database = Arc::new(
        Database::new(&config.database_url)
            .await
            .expect("Failed to create database!"),
    );

    let word_lists = Arc::new(
        WordLists::load(database.clone())
            .await
            .expect("Failed to load word lists!"),
    );

    let notifier: Arc<dyn Notifier> = Arc::new(TelegramNotifier::new(
        bot.clone(),
        config.blocked_activity_chat_id,
        &config.admin_ids,
    ));
    let ocr: Arc<dyn OcrService> = Arc::new(HttpOcr::new(config.ocr_url.clone()));

    let moderator = Arc::new(Moderator::new(
        &config.moderation,
        word_lists,
        database.clone(),
        ocr,
        notifier,
    ));
    let last_tasks = Arc::new(LastTasks::default());

    log::info!("Creating the handler...");

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(handle_message))
        .branch(Update::filter_edited_message().endpoint(handle_message));

    log::info!("Dispatching the dispatcher!");

    Dispatcher::builder(bot, handler)
        .default_handler(|_| async {})
        .dependencies(deps![moderator, config, last_tasks])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    database.close().await;
    log::info!("Shut down.");
}
