use std::sync::Arc;

use uuid::Uuid;

use crate::clock::Clock;
use crate::db::slots::{load_sequence, save_sequence, SlotKind, SlotStore};
use crate::error::{AppError, AppResult};
use crate::models::mood::{Mood, MoodEntry};
use crate::models::user::Identity;
use crate::mood::stats::{self, MoodStats};

/// One user's mood log, at most one entry per calendar day.
pub struct MoodStore {
    slots: Arc<dyn SlotStore>,
    clock: Arc<dyn Clock>,
    identity: Identity,
    entries: Vec<MoodEntry>,
}

impl MoodStore {
    pub fn new(slots: Arc<dyn SlotStore>, clock: Arc<dyn Clock>, identity: Identity) -> Self {
        Self {
            slots,
            clock,
            identity,
            entries: Vec::new(),
        }
    }

    pub async fn load(&mut self) -> AppResult<&[MoodEntry]> {
        let Some(user_id) = self.identity.user_id() else {
            self.entries.clear();
            return Ok(&self.entries);
        };

        let key = SlotKind::MoodEntries.key(user_id);
        self.entries = load_sequence(self.slots.as_ref(), &key)
            .await?
            .unwrap_or_default();

        tracing::debug!(user_id = %user_id, entries = self.entries.len(), "Mood entries loaded");
        Ok(&self.entries)
    }

    /// Record today's mood. A second call on the same day replaces the
    /// earlier entry in its original position.
    pub async fn add(&mut self, mood: Mood, notes: Option<String>) -> AppResult<MoodEntry> {
        if self.identity == Identity::Anonymous {
            return Err(AppError::Unauthorized);
        }

        let today = self.clock.today();
        let entry = MoodEntry {
            id: Uuid::now_v7().to_string(),
            date: today,
            mood,
            notes,
        };

        let mut next = self.entries.clone();
        match next.iter_mut().find(|e| e.date == today) {
            Some(existing) => *existing = entry.clone(),
            None => next.push(entry.clone()),
        }

        // Memory only moves once the slot holds the new log.
        self.persist(&next).await?;
        self.entries = next;
        Ok(entry)
    }

    pub fn today(&self) -> Option<&MoodEntry> {
        let today = self.clock.today();
        self.entries.iter().find(|e| e.date == today)
    }

    pub fn entries(&self) -> &[MoodEntry] {
        &self.entries
    }

    pub fn stats(&self) -> MoodStats {
        stats::summarize(&self.entries, self.clock.today())
    }

    async fn persist(&self, entries: &[MoodEntry]) -> AppResult<()> {
        let Some(user_id) = self.identity.user_id() else {
            return Ok(());
        };
        if entries.is_empty() {
            return Ok(());
        }

        let key = SlotKind::MoodEntries.key(user_id);
        save_sequence(self.slots.as_ref(), &key, entries).await
    }
}
