//! Per-client attempt budgets for the credential routes.
//!
//! Registration and login are counted separately, per client IP, in fixed
//! windows. State lives in process memory, so a restart forgets it and
//! several instances do not share it.

use std::{collections::HashMap, net::IpAddr, net::SocketAddr, sync::Arc, time::Duration};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use tokio::{sync::Mutex, time::Instant};

use crate::error::AppError;
use crate::AppState;

/// The credential routes that spend from a budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthRoute {
    Register,
    Login,
}

impl AuthRoute {
    pub fn from_path(path: &str) -> Option<Self> {
        match path {
            "/api/auth/register" => Some(AuthRoute::Register),
            "/api/auth/login" => Some(AuthRoute::Login),
            _ => None,
        }
    }

    pub fn budget(self) -> Budget {
        match self {
            AuthRoute::Register | AuthRoute::Login => Budget {
                attempts: 5,
                window: Duration::from_secs(60),
            },
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Budget {
    pub attempts: u32,
    pub window: Duration,
}

struct Window {
    used: u32,
    opened_at: Instant,
}

#[derive(Clone, Default)]
pub struct RateLimitState {
    windows: Arc<Mutex<HashMap<(IpAddr, AuthRoute), Window>>>,
}

impl RateLimitState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spend one attempt. `Ok(left)` while the budget holds, otherwise
    /// `Err(retry_after)`.
    pub async fn spend(&self, ip: IpAddr, route: AuthRoute) -> Result<u32, Duration> {
        let budget = route.budget();
        let now = Instant::now();
        let mut windows = self.windows.lock().await;

        let window = windows.entry((ip, route)).or_insert(Window {
            used: 0,
            opened_at: now,
        });
        if now.duration_since(window.opened_at) >= budget.window {
            window.used = 0;
            window.opened_at = now;
        }

        if window.used >= budget.attempts {
            return Err(budget
                .window
                .saturating_sub(now.duration_since(window.opened_at)));
        }
        window.used += 1;
        Ok(budget.attempts - window.used)
    }

    /// Forget windows that have run out.
    pub async fn sweep(&self) {
        let now = Instant::now();
        self.windows
            .lock()
            .await
            .retain(|(_, route), w| now.duration_since(w.opened_at) < route.budget().window);
    }

    pub fn spawn_cleanup_worker(&self) {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(300));
            loop {
                ticker.tick().await;
                limiter.sweep().await;
            }
        });
    }

    #[cfg(test)]
    async fn tracked(&self) -> usize {
        self.windows.lock().await.len()
    }
}

pub async fn rate_limit_auth(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let Some(route) = AuthRoute::from_path(req.uri().path()) else {
        return Ok(next.run(req).await);
    };

    match state.rate_limiter.spend(addr.ip(), route).await {
        Ok(left) => {
            tracing::debug!(ip = %addr.ip(), route = ?route, left, "Auth attempt allowed");
            Ok(next.run(req).await)
        }
        Err(retry_after) => {
            tracing::warn!(
                ip = %addr.ip(),
                route = ?route,
                retry_after_secs = retry_after.as_secs(),
                "Auth attempts exhausted"
            );
            Err(AppError::RateLimited)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    const HOME: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20));
    const CAFE: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7));

    #[test]
    fn only_credential_paths_are_budgeted() {
        assert_eq!(AuthRoute::from_path("/api/auth/login"), Some(AuthRoute::Login));
        assert_eq!(
            AuthRoute::from_path("/api/auth/register"),
            Some(AuthRoute::Register)
        );
        assert_eq!(AuthRoute::from_path("/api/auth/logout"), None);
        assert_eq!(AuthRoute::from_path("/api/mood/entries"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn sixth_login_in_a_minute_is_refused() {
        let limiter = RateLimitState::new();
        for left in (0..5).rev() {
            assert_eq!(limiter.spend(HOME, AuthRoute::Login).await, Ok(left));
        }

        tokio::time::advance(Duration::from_secs(20)).await;
        let retry_after = limiter.spend(HOME, AuthRoute::Login).await.unwrap_err();
        assert_eq!(retry_after, Duration::from_secs(40));
    }

    #[tokio::test(start_paused = true)]
    async fn login_and_register_budgets_are_separate_per_client() {
        let limiter = RateLimitState::new();
        for _ in 0..5 {
            limiter.spend(HOME, AuthRoute::Login).await.unwrap();
        }

        assert!(limiter.spend(HOME, AuthRoute::Login).await.is_err());
        assert!(limiter.spend(HOME, AuthRoute::Register).await.is_ok());
        assert!(limiter.spend(CAFE, AuthRoute::Login).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn budget_refills_after_the_window() {
        let limiter = RateLimitState::new();
        for _ in 0..5 {
            limiter.spend(HOME, AuthRoute::Login).await.unwrap();
        }
        assert!(limiter.spend(HOME, AuthRoute::Login).await.is_err());

        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(limiter.spend(HOME, AuthRoute::Login).await, Ok(4));
    }

    #[tokio::test(start_paused = true)]
    async fn sweep_forgets_finished_windows() {
        let limiter = RateLimitState::new();
        limiter.spend(HOME, AuthRoute::Login).await.unwrap();
        tokio::time::advance(Duration::from_secs(30)).await;
        limiter.spend(CAFE, AuthRoute::Register).await.unwrap();

        tokio::time::advance(Duration::from_secs(45)).await;
        limiter.sweep().await;
        assert_eq!(limiter.tracked().await, 1);
    }
}
