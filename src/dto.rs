//! # MindMate — Request/Response DTOs
//!
//! Conventions:
//! - `*Request`  → deserialized from client JSON bodies
//! - `*Response` → serialized to client JSON
//! - Validation is expressed via `validator` derive macros

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::message::Message;
use crate::models::mood::Mood;
use crate::models::user::UserProfile;

// ============================================================================
// Auth
// ============================================================================

/// POST /api/auth/register
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Invalid email format"))]
    #[validate(length(max = 254, message = "Email too long"))]
    pub email: String,

    #[validate(length(min = 8, max = 128, message = "Password must be 8-128 characters"))]
    pub password: String,

    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: String,
}

/// POST /api/auth/login
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1))]
    pub password: String,
}

/// Response for register and login
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub expires_in: i64,
    pub user: UserProfile,
}

// ============================================================================
// Mood
// ============================================================================

/// POST /api/mood/entries
#[derive(Debug, Deserialize, Validate)]
pub struct AddMoodRequest {
    pub mood: Mood,

    #[validate(length(max = 2000, message = "Notes must be at most 2000 characters"))]
    pub notes: Option<String>,
}

// ============================================================================
// Chat
// ============================================================================

/// POST /api/chat/messages
#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(max = 4000, message = "Message must be at most 4000 characters"))]
    pub text: String,
}

/// The user's message as stored, or `None` when the text was blank.
#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub message: Option<Message>,
}
