// src/config.rs

use std::env;
use dotenvy::dotenv;

use crate::assessment::VerdictPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    /// Overall score (percent) at or above which the verdict is Hire.
    pub hire_threshold: f64,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set");

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(86_400);

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let hire_threshold = env::var("HIRE_THRESHOLD")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(VerdictPolicy::default().hire_threshold);

        let port = env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);

        Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            hire_threshold,
            port,
        }
    }

    pub fn verdict_policy(&self) -> VerdictPolicy {
        VerdictPolicy {
            hire_threshold: self.hire_threshold,
        }
    }
}
