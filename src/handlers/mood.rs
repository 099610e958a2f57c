use axum::{extract::State, Extension, Json};
use validator::Validate;

use crate::dto::AddMoodRequest;
use crate::error::AppResult;
use crate::models::mood::MoodEntry;
use crate::models::user::Identity;
use crate::mood::MoodStats;
use crate::AppState;

pub async fn list_entries(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<Vec<MoodEntry>>> {
    let session = state.sessions.open(identity).await?;
    let store = session.mood.lock().await;
    Ok(Json(store.entries().to_vec()))
}

pub async fn add_entry(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(body): Json<AddMoodRequest>,
) -> AppResult<Json<MoodEntry>> {
    body.validate()?;
    let notes = body.notes.filter(|n| !n.trim().is_empty());

    let session = state.sessions.open(identity).await?;
    let entry = session.mood.lock().await.add(body.mood, notes).await?;

    tracing::debug!(user_id = %session.user_id, date = %entry.date, mood = ?entry.mood, "Mood logged");
    Ok(Json(entry))
}

pub async fn today_entry(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<Option<MoodEntry>>> {
    let session = state.sessions.open(identity).await?;
    let store = session.mood.lock().await;
    Ok(Json(store.today().cloned()))
}

pub async fn get_stats(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<MoodStats>> {
    let session = state.sessions.open(identity).await?;
    let store = session.mood.lock().await;
    Ok(Json(store.stats()))
}
