//! In-memory view of a chat session's context.
//!
//! `Session` wraps the persisted context blob with dirty tracking so the
//! owning application can mutate it freely during a request and write it
//! back once, only when something actually changed.

use anyhow::Result;
use serde_json::Value;

use crate::db::entities::chat_sessions;
use crate::db::repo::Repo;
use crate::db::types::SessionContext;

pub struct Session {
    id: i32,
    pub app: String,
    pub chat_user_id: Option<String>,
    context: SessionContext,
    dirty: bool,
}

impl Session {
    /// Find or create the session for a platform user and wrap it.
    pub async fn load(repo: &Repo, app: &str, chat_user_id: &str) -> Result<Self> {
        let model = repo.get_or_create_session(app, chat_user_id).await?;
        Ok(Self::from_model(model))
    }

    pub fn from_model(model: chat_sessions::Model) -> Self {
        Self {
            id: model.id,
            app: model.app,
            chat_user_id: model.chat_user_id,
            context: model.context,
            dirty: false,
        }
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }

    /// Set a context key. Writing an unchanged value does not mark the
    /// session dirty.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        if self.context.get(&key) != Some(&value) {
            self.dirty = true;
        }
        self.context.set(key, value);
    }

    pub fn pop(&mut self, key: &str) -> Option<Value> {
        let value = self.context.remove(key);
        if value.is_some() {
            self.dirty = true;
        }
        value
    }

    pub fn clear(&mut self) {
        if !self.context.is_empty() {
            self.dirty = true;
        }
        self.context.clear();
    }

    /// Write the context back if it changed since load or last persist.
    pub async fn persist(&mut self, repo: &Repo) -> Result<()> {
        if self.dirty {
            repo.set_session_context(self.id, self.context.clone())
                .await?;
            self.dirty = false;
        }
        Ok(())
    }
}
