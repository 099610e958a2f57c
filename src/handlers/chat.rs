use axum::{extract::State, http::StatusCode, Extension, Json};
use validator::Validate;

use crate::assistant::conversation::ConversationSnapshot;
use crate::dto::{SendMessageRequest, SendMessageResponse};
use crate::error::AppResult;
use crate::models::user::Identity;
use crate::AppState;

pub async fn list_messages(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<ConversationSnapshot>> {
    let session = state.sessions.open(identity).await?;
    Ok(Json(session.chat.snapshot().await))
}

/// Accepts the message right away; the reply arrives later over the
/// WebSocket or on the next list.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<SendMessageRequest>,
) -> AppResult<(StatusCode, Json<SendMessageResponse>)> {
    body.validate()?;

    let session = state.sessions.open(identity).await?;
    match session.chat.send(&body.text).await? {
        Some(pending) => Ok((
            StatusCode::ACCEPTED,
            Json(SendMessageResponse {
                message: Some(pending.user_message),
            }),
        )),
        None => Ok((StatusCode::OK, Json(SendMessageResponse { message: None }))),
    }
}

pub async fn clear_messages(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<ConversationSnapshot>> {
    let session = state.sessions.open(identity).await?;
    session.chat.clear().await?;
    Ok(Json(session.chat.snapshot().await))
}
