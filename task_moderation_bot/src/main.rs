fn main() {
    bot_commons::start_everything(
        "WARN,task_moderation_bot=debug",
        task_moderation_bot::entry(),
    );
}
