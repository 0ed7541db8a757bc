use std::str::FromStr;

use chrono::{DateTime, Utc};
pub use sqlx::Error;
use sqlx::{
    migrate::MigrateDatabase,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Executor, Row, Sqlite,
};
use teloxide::types::UserId;

use crate::{
    stores::{BanLedgerStore, StoreFuture, WordListStore},
    types::{BanRecord, Category, WordEntry},
};

type Pool = sqlx::Pool<Sqlite>;

pub struct Database {
    pool: Pool,
}

impl Database {
    /// Open (creating if needed) the database at `db_url`.
    ///
    /// `sqlite::memory:` works too, with everything living on a single
    /// connection that is never recycled.
    pub async fn new(db_url: &str) -> Result<Database, Error> {
        let in_memory = db_url.contains(":memory:");

        if !in_memory && !Sqlite::database_exists(db_url).await.unwrap_or(false) {
            Sqlite::create_database(db_url).await?;
        }

        let mut pool_options = SqlitePoolOptions::new().max_connections(32);
        if in_memory {
            // Every connection to :memory: is its own database.
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = pool_options
            .connect_with(
                SqliteConnectOptions::from_str(db_url)?
                    .pragma("cache_size", "-32768")
                    .busy_timeout(std::time::Duration::from_secs(600)),
            )
            .await?;

        // WORDS:
        // id (key, i64)
        // category (name of the list, like "long_stop")
        // word (lowercased and trimmed)
        pool.execute(sqlx::query(
            "CREATE TABLE IF NOT EXISTS words (
                id INTEGER PRIMARY KEY NOT NULL,
                category TEXT NOT NULL,
                word TEXT NOT NULL
            ) STRICT;",
        ))
        .await?;

        // BANS:
        // tg_id (key, i64 because sqlite doesn't support u64)
        // ban_counter (content violation bans so far)
        // ban_now (0 for no, 1 for yes)
        // ban_end (date+time in UTC, may be NULL)
        // forever (0 for no, 1 for yes)
        // warning (phone number warnings so far)
        pool.execute(sqlx::query(
            "CREATE TABLE IF NOT EXISTS bans (
                tg_id INTEGER PRIMARY KEY NOT NULL,
                ban_counter INTEGER NOT NULL DEFAULT 0,
                ban_now INTEGER NOT NULL DEFAULT 0,
                ban_end TEXT NULL,
                forever INTEGER NOT NULL DEFAULT 0,
                warning INTEGER NOT NULL DEFAULT 0
            ) STRICT;",
        ))
        .await?;

        pool.execute(sqlx::query(
            "CREATE INDEX IF NOT EXISTS words_category ON words(category, word);",
        ))
        .await?;

        Ok(Database { pool })
    }

    /// Close the pool. Every query after this fails.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn get_words(&self, category: Category) -> Result<Vec<WordEntry>, Error> {
        sqlx::query("SELECT id, word FROM words WHERE category=? ORDER BY id;")
            .bind(category.as_str())
            .map(|row: SqliteRow| WordEntry {
                id: row.get(0),
                word: row.get(1),
            })
            .fetch_all(&self.pool)
            .await
    }

    async fn insert_word(&self, category: Category, word: &str) -> Result<bool, Error> {
        let word = word.trim().to_lowercase();
        // SQLite's NOCASE only folds ASCII, so words are stored lowercased
        // and compared as is.
        let result = sqlx::query(
            "INSERT INTO words(category, word)
            SELECT ?1, ?2
            WHERE NOT EXISTS (SELECT 1 FROM words WHERE category=?1 AND word=?2);",
        )
        .bind(category.as_str())
        .bind(&word)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_word(&self, category: Category, word: &str) -> Result<bool, Error> {
        let word = word.trim().to_lowercase();
        let result = sqlx::query("DELETE FROM words WHERE category=? AND word=?;")
            .bind(category.as_str())
            .bind(&word)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[allow(clippy::cast_possible_wrap)]
    async fn get_ban(&self, tg_id: UserId) -> Result<Option<BanRecord>, Error> {
        sqlx::query(
            "SELECT tg_id, ban_counter, ban_now, ban_end, forever, warning
            FROM bans WHERE tg_id=?;",
        )
        .bind(tg_id.0 as i64)
        .map(ban_record_from_row)
        .fetch_optional(&self.pool)
        .await
    }

    #[allow(clippy::cast_possible_wrap)]
    async fn upsert_ban(&self, record: &BanRecord) -> Result<(), Error> {
        sqlx::query(
            "INSERT INTO bans(tg_id, ban_counter, ban_now, ban_end, forever, warning)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(tg_id) DO
            UPDATE SET ban_counter=?2, ban_now=?3, ban_end=?4, forever=?5, warning=?6;",
        )
        .bind(record.tg_id.0 as i64)
        .bind(record.ban_counter)
        .bind(record.ban_now)
        .bind(record.ban_end)
        .bind(record.forever)
        .bind(record.warning)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[allow(clippy::cast_sign_loss)]
fn ban_record_from_row(row: SqliteRow) -> BanRecord {
    BanRecord {
        tg_id: UserId(row.get::<i64, _>(0) as u64),
        ban_counter: row.get(1),
        ban_now: row.get(2),
        ban_end: row.get::<Option<DateTime<Utc>>, _>(3),
        forever: row.get(4),
        warning: row.get(5),
    }
}

impl WordListStore for Database {
    fn get_all(&self, category: Category) -> StoreFuture<'_, Vec<WordEntry>> {
        Box::pin(self.get_words(category))
    }

    fn insert<'a>(&'a self, category: Category, word: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(self.insert_word(category, word))
    }

    fn delete<'a>(&'a self, category: Category, word: &'a str) -> StoreFuture<'a, bool> {
        Box::pin(self.delete_word(category, word))
    }
}

impl BanLedgerStore for Database {
    fn get(&self, tg_id: UserId) -> StoreFuture<'_, Option<BanRecord>> {
        Box::pin(self.get_ban(tg_id))
    }

    fn upsert<'a>(&'a self, record: &'a BanRecord) -> StoreFuture<'a, ()> {
        Box::pin(self.upsert_ban(record))
    }
}
