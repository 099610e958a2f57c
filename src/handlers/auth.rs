use axum::{extract::State, Extension, Json};
use chrono::Utc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{
    jwt::create_access_token,
    password::{hash_password, verify_password},
};
use crate::dto::{AuthResponse, LoginRequest, RegisterRequest};
use crate::error::{AppError, AppResult};
use crate::models::user::{Identity, User, UserProfile};
use crate::AppState;

fn auth_response(user: User, state: &AppState) -> AppResult<AuthResponse> {
    let token = create_access_token(user.id, &user.email, &state.config)?;
    Ok(AuthResponse {
        access_token: token.access_token,
        expires_in: token.expires_in,
        user: user.into(),
    })
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<Json<AuthResponse>> {
    body.validate()?;
    let email = body.email.trim().to_lowercase();

    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = ?")
        .bind(&email)
        .fetch_one(&state.db)
        .await?;

    if existing > 0 {
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let user = User {
        id: Uuid::new_v4(),
        email,
        password_hash: hash_password(&body.password)?,
        name: body.name.trim().to_string(),
        created_at: Utc::now(),
    };

    sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash, name, created_at)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(user.id)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(&user.name)
    .bind(user.created_at)
    .execute(&state.db)
    .await
    .map_err(duplicate_email_as_conflict)?;

    tracing::info!(user_id = %user.id, "User registered");
    Ok(Json(auth_response(user, &state)?))
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    body.validate()?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(body.email.trim().to_lowercase())
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(&body.password, &user.password_hash)? {
        return Err(AppError::Unauthorized);
    }

    Ok(Json(auth_response(user, &state)?))
}

/// A concurrent registration can slip past the lookup above; the `UNIQUE`
/// index on `users.email` still catches it.
fn duplicate_email_as_conflict(e: sqlx::Error) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict("Email already registered".into())
        }
        _ => AppError::Database(e),
    }
}

/// Ends the user's session. Tokens are stateless and simply expire.
pub async fn logout(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<serde_json::Value>> {
    state.sessions.close(identity).await;
    Ok(Json(serde_json::json!({ "message": "Logged out successfully" })))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> AppResult<Json<UserProfile>> {
    let user_id = identity.user_id().ok_or(AppError::Unauthorized)?;
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("User not found".into()))?;

    Ok(Json(user.into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn users_table() -> sqlx::SqlitePool {
        let pool = crate::db::create_pool("sqlite::memory:").await.unwrap();
        crate::db::run_migrations(&pool).await.unwrap();
        pool
    }

    async fn insert(pool: &sqlx::SqlitePool, email: &str) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO users (id, email, password_hash, name, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4())
        .bind(email)
        .bind("hash")
        .bind("Sam")
        .bind(Utc::now())
        .execute(pool)
        .await
        .map(|_| ())
    }

    #[tokio::test]
    async fn racing_duplicate_email_maps_to_conflict() {
        let pool = users_table().await;
        insert(&pool, "sam@example.com").await.unwrap();

        let err = insert(&pool, "sam@example.com").await.unwrap_err();
        assert!(matches!(
            duplicate_email_as_conflict(err),
            AppError::Conflict(_)
        ));
    }

    #[test]
    fn other_database_errors_stay_database_errors() {
        assert!(matches!(
            duplicate_email_as_conflict(sqlx::Error::RowNotFound),
            AppError::Database(_)
        ));
    }
}
