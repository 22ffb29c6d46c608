// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;

use assessment_backend::{
    config::Config,
    routes,
    state::AppState,
    store::MemoryStore,
    utils::jwt::{Role, sign_jwt},
};

pub const JWT_SECRET: &str = "test_secret_for_integration_tests";

pub struct TestApp {
    pub address: String,
    pub store: Arc<MemoryStore>,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: JWT_SECRET.to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        hire_threshold: 60.0,
        port: 0,
    }
}

/// Spawns the app on a random port, backed by an in-memory store holding
/// `candidates`.
pub async fn spawn_app(candidates: impl IntoIterator<Item = i64>) -> TestApp {
    let store = Arc::new(MemoryStore::with_candidates(candidates));
    let state = AppState::new(store.clone(), test_config());
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        store,
        client: reqwest::Client::new(),
    }
}

pub fn candidate_token(id: i64) -> String {
    sign_jwt(id, Role::Candidate, JWT_SECRET, 600).expect("Failed to sign token")
}

pub fn recruiter_token(id: i64) -> String {
    sign_jwt(id, Role::Recruiter, JWT_SECRET, 600).expect("Failed to sign token")
}
