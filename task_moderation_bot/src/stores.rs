use futures::future::BoxFuture;
use teloxide::types::UserId;

use crate::{
    database::Error,
    types::{BanRecord, Category, WordEntry},
};

pub type StoreFuture<'a, T> = BoxFuture<'a, Result<T, Error>>;

/// Persistent storage of the word lists.
///
/// Words are compared case-insensitively; implementations receive them
/// already lowercased and trimmed.
pub trait WordListStore: Send + Sync {
    /// All entries of a category, oldest first.
    fn get_all(&self, category: Category) -> StoreFuture<'_, Vec<WordEntry>>;

    /// Returns `false` if the word is already in the category.
    fn insert<'a>(&'a self, category: Category, word: &'a str) -> StoreFuture<'a, bool>;

    /// Returns `false` if the word wasn't in the category.
    fn delete<'a>(&'a self, category: Category, word: &'a str) -> StoreFuture<'a, bool>;
}

/// Persistent storage of [`BanRecord`]s, one per user.
pub trait BanLedgerStore: Send + Sync {
    fn get(&self, tg_id: UserId) -> StoreFuture<'_, Option<BanRecord>>;

    /// Insert or overwrite the record, atomically.
    fn upsert<'a>(&'a self, record: &'a BanRecord) -> StoreFuture<'a, ()>;
}
