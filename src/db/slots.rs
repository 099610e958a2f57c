//! Durable key-value slots.
//!
//! A slot holds the whole serialized sequence for one `<kind>_<user id>` key.
//! Writes replace the value wholesale; there are no partial updates and no
//! versioning. Content that fails to parse is treated as if the slot were
//! empty.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    MoodEntries,
    ChatMessages,
}

impl SlotKind {
    pub fn key(self, user_id: Uuid) -> String {
        let prefix = match self {
            SlotKind::MoodEntries => "mood_entries",
            SlotKind::ChatMessages => "chat_messages",
        };
        format!("{}_{}", prefix, user_id)
    }
}

#[async_trait]
pub trait SlotStore: Send + Sync {
    async fn get(&self, key: &str) -> AppResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> AppResult<()>;
    async fn remove(&self, key: &str) -> AppResult<()>;
}

/// Read a sequence from its slot. `None` when the slot is empty or unparsable.
pub async fn load_sequence<T: DeserializeOwned>(
    slots: &dyn SlotStore,
    key: &str,
) -> AppResult<Option<Vec<T>>> {
    let Some(raw) = slots.get(key).await? else {
        return Ok(None);
    };

    match serde_json::from_str::<Vec<T>>(&raw) {
        Ok(items) => Ok(Some(items)),
        Err(e) => {
            tracing::warn!(slot = %key, error = %e, "Discarding unparsable slot content");
            Ok(None)
        }
    }
}

pub async fn save_sequence<T: Serialize>(
    slots: &dyn SlotStore,
    key: &str,
    items: &[T],
) -> AppResult<()> {
    let raw = serde_json::to_string(items)?;
    slots.set(key, &raw).await
}

#[derive(Clone)]
pub struct SqliteSlots {
    db: SqlitePool,
}

impl SqliteSlots {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SlotStore for SqliteSlots {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        let value =
            sqlx::query_scalar::<_, String>("SELECT slot_value FROM kv_slots WHERE slot_key = ?")
                .bind(key)
                .fetch_optional(&self.db)
                .await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_slots (slot_key, slot_value, updated_at)
            VALUES (?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT (slot_key) DO UPDATE SET
                slot_value = excluded.slot_value,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        sqlx::query("DELETE FROM kv_slots WHERE slot_key = ?")
            .bind(key)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}

/// Process-local slots, lost on restart.
#[derive(Default)]
pub struct MemorySlots {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySlots {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SlotStore for MemorySlots {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> AppResult<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
