//! Session context blob.
//!
//! The context is the short-term memory of a session: an arbitrary JSON
//! object the owning application mutates freely. It is stored as a JSON
//! column defaulting to `{}` and round-trips structurally.

use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ops::{Deref, DerefMut};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
#[serde(transparent)]
pub struct SessionContext(pub Map<String, Value>);

impl SessionContext {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.0.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl Deref for SessionContext {
    type Target = Map<String, Value>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for SessionContext {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl From<Map<String, Value>> for SessionContext {
    fn from(map: Map<String, Value>) -> Self {
        SessionContext(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_is_empty_object() {
        let ctx = SessionContext::default();
        assert!(ctx.is_empty());
        assert_eq!(serde_json::to_string(&ctx).unwrap(), "{}");
    }

    #[test]
    fn test_set_get_remove() {
        let mut ctx = SessionContext::default();
        ctx.set("model", json!("dalle3"));
        ctx.set("size", json!("1024x1024"));

        assert_eq!(ctx.get("model"), Some(&json!("dalle3")));
        assert_eq!(ctx.remove("model"), Some(json!("dalle3")));
        assert_eq!(ctx.get("model"), None);
        assert_eq!(ctx.get("size"), Some(&json!("1024x1024")));
    }

    #[test]
    fn test_json_round_trip() {
        let mut ctx = SessionContext::default();
        ctx.set("nested", json!({"a": [1, 2, 3], "b": null}));

        let encoded = serde_json::to_string(&ctx).unwrap();
        let decoded: SessionContext = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, ctx);
    }
}
