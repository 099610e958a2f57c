use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct Liveness {
    status: &'static str,
    service: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Readiness {
    status: &'static str,
    checks: Checks,
    active_sessions: usize,
}

#[derive(Debug, Serialize)]
struct Checks {
    database: &'static str,
    slots: &'static str,
}

fn verdict(ok: bool) -> &'static str {
    if ok {
        "ok"
    } else {
        "failed"
    }
}

pub async fn health_check() -> Json<Liveness> {
    Json(Liveness {
        status: "ok",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Ready once the pool answers and the slot table the stores write to exists.
pub async fn readyz(State(state): State<AppState>) -> (StatusCode, Json<Readiness>) {
    let database = sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(&state.db)
        .await
        .is_ok();
    let slots = database
        && sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM kv_slots")
            .fetch_one(&state.db)
            .await
            .is_ok();

    let ready = database && slots;
    if !ready {
        tracing::warn!(database, slots, "Readiness check failed");
    }

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(Readiness {
            status: if ready { "ready" } else { "not_ready" },
            checks: Checks {
                database: verdict(database),
                slots: verdict(slots),
            },
            active_sessions: state.sessions.active_count().await,
        }),
    )
}
