//! Per-user thread and file storage.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::assistant::AssistantApi;
use crate::error::{BridgeError, Result};

/// State kept for one user.
///
/// The thread slot sits behind an async mutex that is held across the remote
/// create/delete calls, so two requests for the same user cannot both create
/// a thread.
#[derive(Debug)]
pub struct Session {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    /// User identifier.
    user_id: String,
    /// Current remote thread, if any.
    thread: Mutex<Option<String>>,
    /// Files produced for this user, keyed by file id.
    files: RwLock<HashMap<String, Vec<u8>>>,
    /// Session creation time.
    created_at: DateTime<Utc>,
}

impl Clone for Session {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Session {
    fn new(user_id: String) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                user_id,
                thread: Mutex::new(None),
                files: RwLock::new(HashMap::new()),
                created_at: Utc::now(),
            }),
        }
    }

    /// Get the user ID.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.inner.user_id
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    /// Current thread id, if one has been created.
    pub async fn thread_id(&self) -> Option<String> {
        self.inner.thread.lock().await.clone()
    }

    /// Store file content under `file_id`, replacing any previous content.
    pub fn record_file(&self, file_id: impl Into<String>, content: Vec<u8>) {
        let mut guard = self.inner.files.write().unwrap();
        guard.insert(file_id.into(), content);
    }

    /// Get the content of a stored file.
    #[must_use]
    pub fn file(&self, file_id: &str) -> Option<Vec<u8>> {
        self.inner.files.read().unwrap().get(file_id).cloned()
    }

    /// Number of stored files.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.inner.files.read().unwrap().len()
    }
}

/// Thread-safe store for user sessions.
///
/// Cloning is cheap; all clones share the same map and the same assistant
/// service handle.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

#[derive(Debug)]
struct SessionStoreInner {
    sessions: RwLock<HashMap<String, Session>>,
    api: Arc<dyn AssistantApi>,
}

impl SessionStore {
    /// Create an empty store backed by `api` for thread lifecycle calls.
    #[must_use]
    pub fn new(api: Arc<dyn AssistantApi>) -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                sessions: RwLock::new(HashMap::new()),
                api,
            }),
        }
    }

    /// Get a session by user ID.
    #[must_use]
    pub fn get(&self, user_id: &str) -> Option<Session> {
        let guard = self.inner.sessions.read().unwrap();
        guard.get(user_id).cloned()
    }

    /// Get a session by user ID, creating it if it doesn't exist.
    #[must_use]
    pub fn get_or_create(&self, user_id: &str) -> Session {
        // Try read-only first
        if let Some(session) = self.get(user_id) {
            return session;
        }

        let mut guard = self.inner.sessions.write().unwrap();
        guard
            .entry(user_id.to_string())
            .or_insert_with(|| Session::new(user_id.to_string()))
            .clone()
    }

    /// Return the user's thread, creating one remotely if none is recorded.
    pub async fn get_or_create_thread(&self, user_id: &str) -> Result<String> {
        self.ensure_thread(user_id, false).await
    }

    /// Replace the user's thread: delete the recorded one (if any) and create
    /// a new one.
    pub async fn reset_thread(&self, user_id: &str) -> Result<String> {
        self.ensure_thread(user_id, true).await
    }

    /// Route helper: create a thread on first contact, reset it when `reset`
    /// is set and one exists, reuse it otherwise.
    pub async fn ensure_thread(&self, user_id: &str, reset: bool) -> Result<String> {
        loop {
            let session = self.get_or_create(user_id);
            let mut slot = session.inner.thread.lock().await;

            // A concurrent remove may have dropped this session while we waited.
            if !self.is_current(user_id, &session) {
                continue;
            }

            if let Some(existing) = slot.clone() {
                if !reset {
                    return Ok(existing);
                }
                self.inner.api.delete_thread(&existing).await?;
                tracing::info!(user_id = %user_id, thread_id = %existing, "Thread reset");
                *slot = None;
            }

            let thread = self.inner.api.create_thread().await?;
            tracing::info!(user_id = %user_id, thread_id = %thread.id, "Thread created");
            *slot = Some(thread.id.clone());
            return Ok(thread.id);
        }
    }

    /// Whether `session` is still the one stored for `user_id`.
    fn is_current(&self, user_id: &str, session: &Session) -> bool {
        self.inner
            .sessions
            .read()
            .unwrap()
            .get(user_id)
            .is_some_and(|stored| Arc::ptr_eq(&stored.inner, &session.inner))
    }

    /// Store file content for a user, creating the session if needed.
    pub fn record_file(&self, user_id: &str, file_id: impl Into<String>, content: Vec<u8>) {
        self.get_or_create(user_id).record_file(file_id, content);
    }

    /// Get file content recorded for a user.
    pub fn get_file(&self, user_id: &str, file_id: &str) -> Result<Vec<u8>> {
        let session = self
            .get(user_id)
            .ok_or_else(|| BridgeError::NotFound(format!("user {user_id}")))?;
        session
            .file(file_id)
            .ok_or_else(|| BridgeError::NotFound(format!("file {file_id} for user {user_id}")))
    }

    /// Delete the user's remote thread and drop the session.
    ///
    /// The session leaves the map while its thread slot is still locked, so
    /// a waiting `ensure_thread` starts over on a fresh session. If the
    /// remote deletion fails the session is kept.
    pub async fn remove(&self, user_id: &str) -> Result<()> {
        let not_found = || BridgeError::NotFound(format!("user {user_id}"));
        let session = self.get(user_id).ok_or_else(not_found)?;

        let mut slot = session.inner.thread.lock().await;
        if !self.is_current(user_id, &session) {
            return Err(not_found());
        }

        if let Some(thread_id) = slot.as_deref() {
            self.inner.api.delete_thread(thread_id).await?;
            tracing::info!(user_id = %user_id, thread_id = %thread_id, "Thread deleted");
        }
        *slot = None;

        self.inner.sessions.write().unwrap().remove(user_id);
        tracing::info!(
            user_id = %user_id,
            created_at = %session.created_at(),
            files = session.file_count(),
            "Session removed"
        );
        Ok(())
    }

    /// All recorded thread ids.
    pub async fn thread_ids(&self) -> Vec<String> {
        let sessions: Vec<Session> = self.inner.sessions.read().unwrap().values().cloned().collect();

        let mut ids = Vec::with_capacity(sessions.len());
        for session in sessions {
            if let Some(id) = session.thread_id().await {
                ids.push(id);
            }
        }
        ids
    }

    /// Get the number of sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.sessions.read().unwrap().len()
    }

    /// Check if there are no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// List all user IDs.
    #[must_use]
    pub fn list_user_ids(&self) -> Vec<String> {
        self.inner
            .sessions
            .read()
            .unwrap()
            .keys()
            .cloned()
            .collect()
    }
}
