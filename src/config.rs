use std::env;
use std::time::Duration;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub frontend_url: String,

    pub jwt_secret: String,
    pub jwt_access_ttl_secs: i64,

    /// How long the assistant "types" before its reply lands.
    pub chat_reply_delay_ms: u64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source. Unset variables take their defaults;
    /// set but unparsable ones are an error.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        Ok(Self {
            database_url: var("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://mindmate.db?mode=rwc".into()),
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: var("PORT")
                .unwrap_or_else(|| "8080".into())
                .parse()
                .context("PORT must be a number")?,
            frontend_url: var("FRONTEND_URL").unwrap_or_else(|| "http://localhost:3000".into()),

            jwt_secret: var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_access_ttl_secs: var("JWT_ACCESS_TTL_SECS")
                .unwrap_or_else(|| "900".into())
                .parse()
                .context("JWT_ACCESS_TTL_SECS must be a number")?,

            chat_reply_delay_ms: var("CHAT_REPLY_DELAY_MS")
                .unwrap_or_else(|| "1500".into())
                .parse()
                .context("CHAT_REPLY_DELAY_MS must be a number of milliseconds")?,
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn chat_reply_delay(&self) -> Duration {
        Duration::from_millis(self.chat_reply_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_fill_unset_variables() {
        let config = Config::from_lookup(lookup(&[("JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
        assert_eq!(config.jwt_access_ttl_secs, 900);
        assert_eq!(config.chat_reply_delay(), Duration::from_millis(1500));
    }

    #[test]
    fn jwt_secret_is_required() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
    }

    #[test]
    fn malformed_reply_delay_is_an_error() {
        let err = Config::from_lookup(lookup(&[
            ("JWT_SECRET", "s3cret"),
            ("CHAT_REPLY_DELAY_MS", "soon"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("CHAT_REPLY_DELAY_MS"));
    }
}
