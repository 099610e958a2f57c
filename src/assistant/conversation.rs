use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

use crate::assistant::classifier::{KeywordResponder, Responder};
use crate::clock::Clock;
use crate::db::slots::{load_sequence, save_sequence, SlotKind, SlotStore};
use crate::error::{AppError, AppResult};
use crate::models::message::Message;
use crate::models::user::Identity;

pub const DEFAULT_REPLY_DELAY: Duration = Duration::from_millis(1500);

#[derive(Default)]
struct ConversationState {
    messages: Vec<Message>,
    pending_replies: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationSnapshot {
    pub messages: Vec<Message>,
    pub is_typing: bool,
}

/// A reply that is still being composed.
pub struct PendingReply {
    pub user_message: Message,
    pub reply: JoinHandle<Message>,
}

/// One user's chat history with the assistant.
///
/// Cloning is cheap and every clone shares the same history. The state lock
/// is held across each write to the slot so the slot never sees an older
/// sequence after a newer one.
#[derive(Clone)]
pub struct ConversationStore {
    slots: Arc<dyn SlotStore>,
    clock: Arc<dyn Clock>,
    responder: Arc<dyn Responder>,
    identity: Identity,
    reply_delay: Duration,
    notifier: Option<broadcast::Sender<String>>,
    state: Arc<Mutex<ConversationState>>,
}

impl ConversationStore {
    pub fn new(slots: Arc<dyn SlotStore>, clock: Arc<dyn Clock>, identity: Identity) -> Self {
        Self {
            slots,
            clock,
            responder: Arc::new(KeywordResponder),
            identity,
            reply_delay: DEFAULT_REPLY_DELAY,
            notifier: None,
            state: Arc::new(Mutex::new(ConversationState::default())),
        }
    }

    pub fn with_responder(mut self, responder: Arc<dyn Responder>) -> Self {
        self.responder = responder;
        self
    }

    pub fn with_reply_delay(mut self, reply_delay: Duration) -> Self {
        self.reply_delay = reply_delay;
        self
    }

    /// Publish every appended message as a `message_added` event.
    pub fn with_notifier(mut self, notifier: broadcast::Sender<String>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub async fn load(&self) -> AppResult<Vec<Message>> {
        let mut state = self.state.lock().await;
        let Some(user_id) = self.identity.user_id() else {
            state.messages.clear();
            return Ok(Vec::new());
        };

        let key = SlotKind::ChatMessages.key(user_id);
        match load_sequence::<Message>(self.slots.as_ref(), &key).await? {
            Some(messages) if !messages.is_empty() => {
                tracing::debug!(user_id = %user_id, messages = messages.len(), "Chat history loaded");
                state.messages = messages;
            }
            _ => {
                tracing::debug!(user_id = %user_id, "Starting a new conversation");
                let seeded = vec![Message::welcome(self.clock.now())];
                self.persist(&seeded).await?;
                state.messages = seeded;
            }
        }

        Ok(state.messages.clone())
    }

    /// Append the user's message and start composing the reply.
    ///
    /// Blank input is ignored and returns `None`.
    pub async fn send(&self, text: &str) -> AppResult<Option<PendingReply>> {
        if text.trim().is_empty() {
            return Ok(None);
        }
        if self.identity == Identity::Anonymous {
            return Err(AppError::Unauthorized);
        }

        let user_message = Message::user(text, self.clock.now());
        {
            let mut state = self.state.lock().await;
            state.messages.push(user_message.clone());

            if let Err(e) = self.persist(&state.messages).await {
                state.messages.pop();
                return Err(e);
            }
            state.pending_replies += 1;
        }
        self.notify(&user_message);

        let store = self.clone();
        let text = text.to_string();
        let reply = tokio::spawn(async move { store.compose_reply(&text).await });

        Ok(Some(PendingReply {
            user_message,
            reply,
        }))
    }

    /// Reset to a fresh welcome message and drop the saved history.
    pub async fn clear(&self) -> AppResult<Message> {
        let Some(user_id) = self.identity.user_id() else {
            return Err(AppError::Unauthorized);
        };

        let welcome = Message::welcome(self.clock.now());
        let mut state = self.state.lock().await;
        self.slots
            .remove(&SlotKind::ChatMessages.key(user_id))
            .await?;
        state.messages = vec![welcome.clone()];

        tracing::info!(user_id = %user_id, "Chat history cleared");
        Ok(welcome)
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.state.lock().await.messages.clone()
    }

    pub async fn is_composing(&self) -> bool {
        self.state.lock().await.pending_replies > 0
    }

    pub async fn snapshot(&self) -> ConversationSnapshot {
        let state = self.state.lock().await;
        ConversationSnapshot {
            messages: state.messages.clone(),
            is_typing: state.pending_replies > 0,
        }
    }

    async fn compose_reply(&self, text: &str) -> Message {
        tokio::time::sleep(self.reply_delay).await;

        let outcome = AssertUnwindSafe(self.responder.respond(text))
            .catch_unwind()
            .await;
        let message = match outcome {
            Ok(Ok(reply)) => Message::bot(reply.text, reply.emotion, self.clock.now()),
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Reply generation failed, using fallback");
                Message::fallback(self.clock.now())
            }
            Err(_) => {
                tracing::warn!("Reply generation panicked, using fallback");
                Message::fallback(self.clock.now())
            }
        };

        {
            let mut state = self.state.lock().await;
            state.messages.push(message.clone());
            state.pending_replies = state.pending_replies.saturating_sub(1);

            if let Err(e) = self.persist(&state.messages).await {
                tracing::error!(error = %e, "Failed to save chat history");
            }
        }
        self.notify(&message);

        message
    }

    async fn persist(&self, messages: &[Message]) -> AppResult<()> {
        let Some(user_id) = self.identity.user_id() else {
            return Ok(());
        };
        if messages.is_empty() {
            return Ok(());
        }

        let key = SlotKind::ChatMessages.key(user_id);
        save_sequence(self.slots.as_ref(), &key, messages).await
    }

    fn notify(&self, message: &Message) {
        let (Some(tx), Some(user_id)) = (self.notifier.as_ref(), self.identity.user_id()) else {
            return;
        };
        let event = serde_json::json!({
            "type": "message_added",
            "user_id": user_id,
            "message": message,
        });
        // No subscribers is fine.
        let _ = tx.send(event.to_string());
    }
}
