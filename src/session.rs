//! Per-user sessions.
//!
//! A session is opened on a user's first authenticated request and owns that
//! user's mood store and conversation store until logout.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

use crate::assistant::{ConversationStore, Responder};
use crate::clock::Clock;
use crate::db::SlotStore;
use crate::error::{AppError, AppResult};
use crate::models::user::Identity;
use crate::mood::MoodStore;

pub struct UserSession {
    pub user_id: Uuid,
    pub mood: Mutex<MoodStore>,
    pub chat: ConversationStore,
}

#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<HashMap<Uuid, Arc<UserSession>>>>,
    slots: Arc<dyn SlotStore>,
    clock: Arc<dyn Clock>,
    responder: Arc<dyn Responder>,
    reply_delay: Duration,
    notifier: Option<broadcast::Sender<String>>,
}

impl SessionRegistry {
    pub fn new(
        slots: Arc<dyn SlotStore>,
        clock: Arc<dyn Clock>,
        responder: Arc<dyn Responder>,
        reply_delay: Duration,
    ) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            slots,
            clock,
            responder,
            reply_delay,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: broadcast::Sender<String>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Return the user's live session, loading both stores on first use.
    ///
    /// Anonymous callers have no session.
    pub async fn open(&self, identity: Identity) -> AppResult<Arc<UserSession>> {
        let user_id = identity.user_id().ok_or(AppError::Unauthorized)?;
        if let Some(session) = self.sessions.lock().await.get(&user_id) {
            return Ok(session.clone());
        }

        // Loading happens outside the registry lock so one user's first
        // request never waits on another's.
        let mut mood = MoodStore::new(self.slots.clone(), self.clock.clone(), identity);
        mood.load().await?;

        let mut chat = ConversationStore::new(self.slots.clone(), self.clock.clone(), identity)
            .with_responder(self.responder.clone())
            .with_reply_delay(self.reply_delay);
        if let Some(tx) = &self.notifier {
            chat = chat.with_notifier(tx.clone());
        }
        chat.load().await?;

        let mut sessions = self.sessions.lock().await;
        // A concurrent first request may have won the race; keep its session.
        if let Some(session) = sessions.get(&user_id) {
            return Ok(session.clone());
        }
        let session = Arc::new(UserSession {
            user_id,
            mood: Mutex::new(mood),
            chat,
        });
        sessions.insert(user_id, session.clone());

        tracing::info!(user_id = %user_id, "Session opened");
        Ok(session)
    }

    /// End the user's session. Replies still being composed finish on their own.
    pub async fn close(&self, identity: Identity) -> bool {
        let Some(user_id) = identity.user_id() else {
            return false;
        };
        let closed = self.sessions.lock().await.remove(&user_id).is_some();
        if closed {
            tracing::info!(user_id = %user_id, "Session closed");
        }
        closed
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}
