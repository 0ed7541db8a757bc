//! Boilerplate shared by the bots in this workspace: logger and runtime
//! startup, reading the bot token, and a few helpers around teloxide types.

use std::future::Future;

pub mod useful_methods;

/// Set up logging, then run `closure` to completion on a multi-threaded
/// tokio runtime.
///
/// Log filters come from `RUST_LOG`, or from `default_filter` if it's not
/// set, in [pretty_env_logger][] syntax. Timestamps are left out under
/// systemd, since journald adds its own.
///
/// [pretty_env_logger]: https://docs.rs/pretty_env_logger
///
/// # Panics
///
/// Panics if the tokio runtime can't be built.
pub fn start_everything(default_filter: &str, closure: impl Future<Output = ()>) {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.to_string());

    let mut builder = match std::env::var_os("JOURNAL_STREAM") {
        Some(_) => pretty_env_logger::formatted_builder(),
        None => pretty_env_logger::formatted_timed_builder(),
    };

    if builder.parse_filters(&filter).try_init().is_err() {
        log::error!("Logger was already set up!");
    }

    log::info!("Logging with filter {filter:?}, starting the runtime.");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build the tokio runtime!");
    runtime.block_on(closure);
}

/// Read the bot token from `key`, or from `key_debug` in debug builds.
///
/// # Errors
///
/// Errors if the file can't be read.
pub fn read_bot_key() -> std::io::Result<String> {
    let path = match cfg!(debug_assertions) {
        true => "key_debug",
        false => "key",
    };
    Ok(std::fs::read_to_string(path)?.trim().to_string())
}
