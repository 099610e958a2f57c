use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::identity_from_token;
use crate::dto::SendMessageRequest;
use crate::error::{AppError, AppResult};
use crate::models::user::Identity;
use crate::session::SessionRegistry;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
) -> Response {
    // Browsers can't set headers on the upgrade request, so the token rides
    // in the query string.
    let identity = query
        .token
        .as_deref()
        .ok_or(AppError::Unauthorized)
        .and_then(|token| identity_from_token(token, &state.config));
    let user_id = match identity.map(|i| i.user_id()) {
        Ok(Some(id)) => id,
        _ => {
            tracing::warn!("WebSocket auth failed: missing or invalid token");
            return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id))
}

/// Inbound chat text obeys the same rules as `POST /api/chat/messages`.
async fn relay_inbound(
    sessions: &SessionRegistry,
    identity: Identity,
    text: String,
) -> AppResult<()> {
    let request = SendMessageRequest { text };
    request.validate()?;

    let session = sessions.open(identity).await?;
    session.chat.send(&request.text).await?;
    Ok(())
}

/// Pushes this user's `message_added` events out, and treats incoming text
/// frames as chat messages.
async fn handle_socket(socket: WebSocket, state: AppState, user_id: Uuid) {
    let (mut sender, mut receiver) = socket.split();

    tracing::debug!(user_id = %user_id, "WebSocket connection established");

    let mut rx = state.ws_tx.subscribe();
    let uid = user_id.to_string();
    let mut send_task = tokio::spawn(async move {
        while let Ok(msg) = rx.recv().await {
            let for_this_user = serde_json::from_str::<serde_json::Value>(&msg)
                .ok()
                .and_then(|v| v.get("user_id").and_then(|id| id.as_str()).map(|id| id == uid))
                .unwrap_or(false);
            if !for_this_user {
                continue;
            }
            if sender.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    let sessions = state.sessions.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    match relay_inbound(&sessions, Identity::User(user_id), text).await {
                        Ok(()) => {}
                        Err(AppError::Validation(reason)) => {
                            tracing::debug!(
                                user_id = %user_id,
                                reason = %reason,
                                "Rejected inbound chat message"
                            );
                        }
                        Err(e) => {
                            tracing::error!(user_id = %user_id, error = %e, "Failed to send chat message");
                        }
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    tracing::debug!(user_id = %user_id, "WebSocket connection closed");
}
