//! Keyword emotion detection and canned replies.
//!
//! Rules are checked in order and the first one with a matching keyword
//! wins. Matching is a case-insensitive substring test, so "unhappy" is
//! caught by the `happy` rule before the `sad` rule ever sees it.

use async_trait::async_trait;

use crate::models::message::Emotion;

const RULES: &[(Emotion, &[&str])] = &[
    (Emotion::Happy, &["happy", "good", "great"]),
    (Emotion::Sad, &["sad", "depressed", "unhappy"]),
    (Emotion::Anxious, &["nervous", "anxious", "worried"]),
    (Emotion::Angry, &["angry", "frustrated", "mad"]),
];

pub fn classify(text: &str) -> Emotion {
    let text = text.to_lowercase();
    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(emotion, _)| *emotion)
        .unwrap_or(Emotion::Neutral)
}

pub fn canned_reply(emotion: Emotion) -> &'static str {
    match emotion {
        Emotion::Happy => {
            "It's wonderful to hear you're feeling good! What's been bringing you joy lately?"
        }
        Emotion::Sad => {
            "I'm sorry to hear you're feeling down. Remember that it's okay to feel this way, and these feelings will pass. Would you like to talk about what's bothering you?"
        }
        Emotion::Anxious => {
            "I understand anxiety can be challenging. Let's try a quick breathing exercise: Take a deep breath in for 4 counts, hold for 2, and exhale for 6. How about we try this together?"
        }
        Emotion::Angry => {
            "I can see you're feeling frustrated. It's natural to feel this way sometimes. Would it help to talk through what triggered these feelings?"
        }
        Emotion::Neutral => "Thank you for sharing. How else have you been feeling lately?",
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub emotion: Emotion,
}

/// Produces the assistant's answer to a user message.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, text: &str) -> anyhow::Result<Reply>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordResponder;

#[async_trait]
impl Responder for KeywordResponder {
    async fn respond(&self, text: &str) -> anyhow::Result<Reply> {
        let emotion = classify(text);
        Ok(Reply {
            text: canned_reply(emotion).to_string(),
            emotion,
        })
    }
}
