use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use tokio::sync::Mutex;

use crate::{
    error::ModerationError,
    moderation::classifier::NormalizedText,
    stores::WordListStore,
    types::Category,
};

/// Immutable view of all word lists, already normalized for matching.
#[derive(Debug, Clone, Default)]
pub struct WordListSnapshot {
    lists: HashMap<Category, Vec<String>>,
}

impl WordListSnapshot {
    pub fn words(&self, category: Category) -> &[String] {
        self.lists.get(&category).map_or(&[], Vec::as_slice)
    }

    /// Add a word, normalizing it the same way text is normalized.
    /// Words with no letters at all can never match and are skipped.
    pub fn push(&mut self, category: Category, word: &str) {
        let normalized = NormalizedText::new(word);
        if normalized.is_empty() {
            log::debug!("Skipping {category} entry without letters: {word:?}");
            return;
        }
        self.lists
            .entry(category)
            .or_default()
            .push(normalized.as_str().to_string());
    }

    fn replace(&mut self, category: Category, words: impl IntoIterator<Item = String>) {
        self.lists.remove(&category);
        for word in words {
            self.push(category, &word);
        }
    }
}

/// The word lists, loaded from a [`WordListStore`] at startup and refreshed
/// whenever they're edited through here.
///
/// Readers take a [`WordListSnapshot`] and keep it for a whole evaluation;
/// edits swap in a new snapshot without waiting for readers. Edits to the
/// same category are serialized.
pub struct WordLists {
    store: Arc<dyn WordListStore>,
    snapshot: RwLock<Arc<WordListSnapshot>>,
    edit_locks: HashMap<Category, Mutex<()>>,
}

impl WordLists {
    pub async fn load(store: Arc<dyn WordListStore>) -> Result<WordLists, ModerationError> {
        let word_lists = WordLists {
            store,
            snapshot: RwLock::new(Arc::new(WordListSnapshot::default())),
            edit_locks: Category::ALL
                .into_iter()
                .map(|category| (category, Mutex::new(())))
                .collect(),
        };
        word_lists.reload().await?;
        Ok(word_lists)
    }

    /// The current lists.
    pub fn snapshot(&self) -> Arc<WordListSnapshot> {
        self.snapshot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Re-read every category from the store.
    pub async fn reload(&self) -> Result<(), ModerationError> {
        for category in Category::ALL {
            let _guard = self.edit_lock(category).lock().await;
            self.refresh(category).await?;
        }
        log::info!("Word lists loaded.");
        Ok(())
    }

    /// Add a word to a category. Returns `false` if it's already there.
    pub async fn insert(&self, category: Category, word: &str) -> Result<bool, ModerationError> {
        let word = word.trim().to_lowercase();
        let _guard = self.edit_lock(category).lock().await;
        let inserted = self.store.insert(category, &word).await?;
        if inserted {
            log::info!("Added {word:?} to {category}");
            self.refresh(category).await?;
        }
        Ok(inserted)
    }

    /// Remove a word from a category. Returns `false` if it wasn't there.
    pub async fn delete(&self, category: Category, word: &str) -> Result<bool, ModerationError> {
        let word = word.trim().to_lowercase();
        let _guard = self.edit_lock(category).lock().await;
        let deleted = self.store.delete(category, &word).await?;
        if deleted {
            log::info!("Removed {word:?} from {category}");
            self.refresh(category).await?;
        }
        Ok(deleted)
    }

    /// Words of a category as stored, for showing to admins.
    pub async fn list(&self, category: Category) -> Result<Vec<String>, ModerationError> {
        Ok(self
            .store
            .get_all(category)
            .await?
            .into_iter()
            .map(|entry| entry.word)
            .collect())
    }

    fn edit_lock(&self, category: Category) -> &Mutex<()> {
        &self.edit_locks[&category]
    }

    /// Must be called with the category's edit lock held.
    async fn refresh(&self, category: Category) -> Result<(), ModerationError> {
        let entries = self.store.get_all(category).await?;

        let mut snapshot = self
            .snapshot
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let mut updated = WordListSnapshot::clone(&snapshot);
        updated.replace(category, entries.into_iter().map(|entry| entry.word));
        *snapshot = Arc::new(updated);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;

    async fn word_lists() -> WordLists {
        let db = Database::new("sqlite::memory:").await.unwrap();
        assert!(db.insert(Category::LongStop, "авито").await.unwrap());
        WordLists::load(Arc::new(db)).await.unwrap()
    }

    #[tokio::test]
    async fn loads_existing_words() {
        let lists = word_lists().await;
        assert_eq!(lists.snapshot().words(Category::LongStop), ["авито"]);
        assert!(lists.snapshot().words(Category::White).is_empty());
    }

    #[tokio::test]
    async fn edits_refresh_the_snapshot_but_not_old_ones() {
        let lists = word_lists().await;
        let before = lists.snapshot();

        assert!(lists.insert(Category::LongStop, "  ЮЛА ").await.unwrap());
        assert!(!lists.insert(Category::LongStop, "юла").await.unwrap());

        assert_eq!(before.words(Category::LongStop), ["авито"]);
        assert_eq!(lists.snapshot().words(Category::LongStop), ["авито", "юла"]);

        assert!(lists.delete(Category::LongStop, "Авито").await.unwrap());
        assert!(!lists.delete(Category::LongStop, "авито").await.unwrap());
        assert_eq!(lists.snapshot().words(Category::LongStop), ["юла"]);
        assert_eq!(lists.list(Category::LongStop).await.unwrap(), ["юла"]);
    }

    #[tokio::test]
    async fn concurrent_edits_of_different_categories_all_land() {
        let lists = Arc::new(word_lists().await);
        let mut handles = Vec::new();
        for (i, category) in Category::ALL.into_iter().enumerate() {
            let lists = lists.clone();
            handles.push(tokio::spawn(async move {
                lists.insert(category, &format!("слово{}", "а".repeat(i + 1))).await
            }));
        }
        for handle in handles {
            assert!(handle.await.unwrap().unwrap());
        }

        let snapshot = lists.snapshot();
        for category in Category::ALL {
            assert!(!snapshot.words(category).is_empty(), "{category} is empty");
        }
    }

    #[test]
    fn snapshot_skips_entries_without_letters() {
        let mut snapshot = WordListSnapshot::default();
        snapshot.push(Category::LongStop, "1234");
        snapshot.push(Category::LongStop, "Instagram.com");
        assert_eq!(snapshot.words(Category::LongStop), ["instagram com"]);
    }
}
