//! Conversation history store with a bounded durable cache
//!
//! The store owns the ordered message list; everything else mutates
//! messages through it, keyed by id. Every mutation triggers a best-effort
//! cache write of the trailing window. The cache is an optimization, not a
//! source of truth: persistence failures are logged and swallowed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{MuseError, MuseResult};
use crate::message::Message;

/// Default retention ceiling for a conversation
pub const DEFAULT_RETENTION: usize = 100;

/// Best-effort durable cache for the trailing conversation window
#[async_trait]
pub trait HistoryCache: Send + Sync {
    async fn persist(&self, messages: &[Message]) -> MuseResult<()>;
    async fn load(&self) -> MuseResult<Vec<Message>>;
}

/// JSON-file cache, by default under the user cache directory
pub struct FileHistoryCache {
    path: PathBuf,
}

impl FileHistoryCache {
    /// Cache at the default location (`<cache_dir>/muse/history.json`)
    pub fn new() -> MuseResult<Self> {
        let path = dirs::cache_dir()
            .ok_or_else(|| MuseError::storage("no cache directory available"))?
            .join("muse")
            .join("history.json");
        Ok(Self { path })
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl HistoryCache for FileHistoryCache {
    async fn persist(&self, messages: &[Message]) -> MuseResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string(messages)?;
        fs::write(&self.path, content).await?;
        debug!("cached {} message(s) to {:?}", messages.len(), self.path);
        Ok(())
    }

    async fn load(&self) -> MuseResult<Vec<Message>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// In-memory ordered conversation; insertion order is display order
pub struct HistoryStore {
    messages: Vec<Message>,
    retention: usize,
    cache: Option<Arc<dyn HistoryCache>>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::with_retention(DEFAULT_RETENTION)
    }

    pub fn with_retention(retention: usize) -> Self {
        Self {
            messages: Vec::new(),
            retention: retention.max(1),
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn HistoryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|message| message.id == id)
    }

    /// The `n` most recent messages, oldest first
    pub fn recent(&self, n: usize) -> Vec<Message> {
        let start = self.messages.len().saturating_sub(n);
        self.messages[start..].to_vec()
    }

    /// Restore the cached window.
    ///
    /// Stale streaming flags are cleared: no stream survives a restart, and
    /// a message must never stay `is_streaming` forever.
    pub async fn restore(&mut self) -> MuseResult<()> {
        let Some(cache) = &self.cache else {
            return Ok(());
        };
        let mut messages = cache.load().await?;
        for message in &mut messages {
            message.is_streaming = false;
        }
        self.messages = messages;
        self.enforce_retention();
        Ok(())
    }

    pub async fn append(&mut self, message: Message) {
        self.messages.push(message);
        self.enforce_retention();
        self.persist().await;
    }

    /// Apply `mutate` to the message with `id`; returns the updated copy
    pub async fn update<F>(&mut self, id: &str, mutate: F) -> MuseResult<Message>
    where
        F: FnOnce(&mut Message),
    {
        let message = self
            .messages
            .iter_mut()
            .find(|message| message.id == id)
            .ok_or_else(|| MuseError::storage(format!("no message with id '{}'", id)))?;
        mutate(message);
        let updated = message.clone();
        self.persist().await;
        Ok(updated)
    }

    /// Append one streamed fragment to a message's content
    pub async fn append_fragment(&mut self, id: &str, fragment: &str) -> MuseResult<Message> {
        self.update(id, |message| message.content.push_str(fragment))
            .await
    }

    pub async fn delete(&mut self, id: &str) -> MuseResult<()> {
        let before = self.messages.len();
        self.messages.retain(|message| message.id != id);
        if self.messages.len() == before {
            return Err(MuseError::storage(format!("no message with id '{}'", id)));
        }
        self.persist().await;
        Ok(())
    }

    pub async fn clear(&mut self) {
        self.messages.clear();
        self.persist().await;
    }

    /// Drop the oldest non-streaming messages above the retention ceiling.
    /// A message that is currently streaming is never evicted.
    fn enforce_retention(&mut self) {
        while self.messages.len() > self.retention {
            let Some(pos) = self.messages.iter().position(|m| !m.is_streaming) else {
                break;
            };
            self.messages.remove(pos);
        }
    }

    /// Best-effort cache write of the trailing window
    async fn persist(&self) {
        let Some(cache) = &self.cache else {
            return;
        };
        let start = self.messages.len().saturating_sub(self.retention);
        if let Err(error) = cache.persist(&self.messages[start..]).await {
            warn!("failed to cache conversation history: {}", error);
        }
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(content: &str) -> Message {
        Message::user(content)
    }

    #[tokio::test]
    async fn append_keeps_insertion_order() {
        let mut store = HistoryStore::new();
        store.append(user("one")).await;
        store.append(user("two")).await;
        store.append(user("three")).await;

        let contents: Vec<&str> = store
            .messages()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
    }

    #[tokio::test]
    async fn recent_returns_trailing_window_oldest_first() {
        let mut store = HistoryStore::new();
        for i in 0..15 {
            store.append(user(&format!("m{}", i))).await;
        }

        let window = store.recent(10);
        assert_eq!(window.len(), 10);
        assert_eq!(window[0].content, "m5");
        assert_eq!(window[9].content, "m14");

        // asking for more than exists returns everything
        assert_eq!(store.recent(100).len(), 15);
    }

    #[tokio::test]
    async fn update_mutates_in_place_by_id() {
        let mut store = HistoryStore::new();
        let message = Message::assistant_placeholder();
        let id = message.id.clone();
        store.append(message).await;

        let updated = store
            .update(&id, |m| {
                m.content.push_str("hello");
                m.is_streaming = false;
            })
            .await
            .unwrap();

        assert_eq!(updated.content, "hello");
        assert!(!updated.is_streaming);
        assert_eq!(store.get(&id).unwrap().content, "hello");
    }

    #[tokio::test]
    async fn update_unknown_id_fails() {
        let mut store = HistoryStore::new();
        let error = store.update("missing", |_| {}).await.unwrap_err();
        assert!(matches!(error, MuseError::Storage(_)));
    }

    #[tokio::test]
    async fn append_fragment_grows_content_monotonically() {
        let mut store = HistoryStore::new();
        let message = Message::assistant_placeholder();
        let id = message.id.clone();
        store.append(message).await;

        store.append_fragment(&id, "Hel").await.unwrap();
        store.append_fragment(&id, "lo ").await.unwrap();
        let last = store.append_fragment(&id, "world").await.unwrap();

        assert_eq!(last.content, "Hello world");
    }

    #[tokio::test]
    async fn delete_and_clear() {
        let mut store = HistoryStore::new();
        let message = user("bye");
        let id = message.id.clone();
        store.append(message).await;
        store.append(user("stay")).await;

        store.delete(&id).await.unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.delete(&id).await.is_err());

        store.clear().await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn retention_drops_oldest_first() {
        let mut store = HistoryStore::with_retention(3);
        for i in 0..5 {
            store.append(user(&format!("m{}", i))).await;
        }

        let contents: Vec<&str> = store
            .messages()
            .iter()
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);
    }

    #[tokio::test]
    async fn retention_never_evicts_a_streaming_message() {
        let mut store = HistoryStore::with_retention(2);
        let streaming = Message::assistant_placeholder();
        let streaming_id = streaming.id.clone();
        store.append(streaming).await;

        for i in 0..4 {
            store.append(user(&format!("m{}", i))).await;
        }

        assert_eq!(store.len(), 2);
        assert!(store.get(&streaming_id).is_some());
        assert_eq!(store.messages()[1].content, "m3");
    }

    #[tokio::test]
    async fn file_cache_round_trips_the_window() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(FileHistoryCache::with_path(dir.path().join("history.json")));

        let mut store = HistoryStore::with_retention(2).with_cache(cache.clone());
        for i in 0..3 {
            store.append(user(&format!("m{}", i))).await;
        }

        let cached = cache.load().await.unwrap();
        let contents: Vec<&str> = cached.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m1", "m2"]);
    }

    #[tokio::test]
    async fn restore_clears_stale_streaming_flags() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(FileHistoryCache::with_path(dir.path().join("history.json")));

        let mut stale = Message::assistant_placeholder();
        stale.content = "half a reply".to_string();
        cache.persist(&[stale]).await.unwrap();

        let mut store = HistoryStore::new().with_cache(cache);
        store.restore().await.unwrap();

        assert_eq!(store.len(), 1);
        assert!(!store.messages()[0].is_streaming);
        assert_eq!(store.messages()[0].content, "half a reply");
    }

    #[tokio::test]
    async fn cache_failures_are_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        // a file where the cache wants a directory, so every write fails
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let cache = Arc::new(FileHistoryCache::with_path(
            blocker.join("sub").join("history.json"),
        ));

        let mut store = HistoryStore::new().with_cache(cache);
        store.append(user("still works")).await;

        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn missing_cache_file_restores_empty() {
        let dir = tempfile::tempdir().unwrap();
        let cache = Arc::new(FileHistoryCache::with_path(dir.path().join("absent.json")));

        let mut store = HistoryStore::new().with_cache(cache);
        store.restore().await.unwrap();
        assert!(store.is_empty());
    }
}
