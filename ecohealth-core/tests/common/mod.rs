#![allow(dead_code)]

use ecohealth_core::{JoinStrategy, MemoryTokenStore, Portal, PortalConfig, SessionEvent, TokenStore};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::broadcast;
use wiremock::MockServer;

pub struct TestPortal {
    pub server: MockServer,
    pub portal: Portal,
    pub tokens: Arc<MemoryTokenStore>,
}

pub fn config_for(server: &MockServer) -> PortalConfig {
    let mut config = PortalConfig::default();
    config.backends.auth_url = format!("{}/auth", server.uri());
    config.backends.chat_url = format!("{}/chat", server.uri());
    config.backends.feedback_url = format!("{}/feedback", server.uri());
    config
}

pub async fn test_portal(token: Option<&str>) -> TestPortal {
    test_portal_with(token, JoinStrategy::Strict).await
}

pub async fn test_portal_with(token: Option<&str>, strategy: JoinStrategy) -> TestPortal {
    let server = MockServer::start().await;
    let mut config = config_for(&server);
    config.directory.join_strategy = strategy;

    let tokens = Arc::new(match token {
        Some(t) => MemoryTokenStore::with_token(t),
        None => MemoryTokenStore::new(),
    });
    let shared: Arc<dyn TokenStore> = tokens.clone();
    let portal = Portal::with_token_store(config, shared);

    TestPortal {
        server,
        portal,
        tokens,
    }
}

pub fn patient_json(id: &str) -> Value {
    json!({
        "id": id,
        "email": "patient@example.com",
        "first_name": "Pat",
        "last_name": "Doe",
        "phone_number": "612345678",
        "address": "1 Main St",
        "notification_preferences": "email",
        "language_preferences": "en",
        "doctors": [
            {"doctor_id": "7c1d2e3f-4a5b", "department": "Cardiology"},
            {"doctor_id": "9a8b7c6d-5e4f", "department": "Neurology", "specialty": "Stroke"}
        ]
    })
}

pub fn success(data: Value) -> Value {
    json!({"status": "success", "message": "ok", "data": data})
}

pub fn login_body(id: &str, token: &str) -> Value {
    json!({
        "status": "success",
        "data": {
            "access_token": token,
            "token_type": "bearer",
            "patient": patient_json(id)
        }
    })
}

/// Logout events delivered so far.
pub fn drain_logouts(events: &mut broadcast::Receiver<SessionEvent>) -> usize {
    let mut count = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event, SessionEvent::LoggedOut { .. }) {
            count += 1;
        }
    }
    count
}
