use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const WELCOME_ID: &str = "welcome";
pub const WELCOME_TEXT: &str =
    "Hi there! I'm MindMate, your mental health assistant. How are you feeling today?";
pub const FALLBACK_TEXT: &str = "I'm sorry, I couldn't process your message. Please try again.";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Sad,
    Anxious,
    Angry,
    Neutral,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub text: String,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emotion: Option<Emotion>,
}

impl Message {
    pub fn user(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            text: text.into(),
            sender: Sender::User,
            timestamp,
            emotion: None,
        }
    }

    pub fn bot(text: impl Into<String>, emotion: Emotion, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            text: text.into(),
            sender: Sender::Bot,
            timestamp,
            emotion: Some(emotion),
        }
    }

    pub fn welcome(timestamp: DateTime<Utc>) -> Self {
        Self {
            id: WELCOME_ID.into(),
            ..Self::bot(WELCOME_TEXT, Emotion::Neutral, timestamp)
        }
    }

    pub fn fallback(timestamp: DateTime<Utc>) -> Self {
        Self::bot(FALLBACK_TEXT, Emotion::Neutral, timestamp)
    }
}
