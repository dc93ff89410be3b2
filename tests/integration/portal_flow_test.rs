use ecohealth_core::{
    JoinStrategy, LoginCredentials, MemoryTokenStore, Portal, PortalConfig, PortalError,
    SessionEvent, TokenStore,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn patient(id: &str) -> Value {
    json!({
        "id": id,
        "email": "patient@example.com",
        "first_name": "Pat",
        "last_name": "Doe",
        "doctors": [
            {"doctor_id": "7c1d2e3f-4a5b-4c6d", "department": "Cardiology"},
            {"doctor_id": "9a8b7c6d-5e4f-4a3b", "department": "Neurology", "specialty": "Stroke"},
            {"doctor_id": "1f2e3d4c-5b6a-4978", "department": "Dermatology"}
        ]
    })
}

fn roster() -> Value {
    json!([{
        "full_name": "Dr. Amina Yusuf",
        "phone": "612000111",
        "email": "amina.yusuf@ecohealth.example",
        "specialty": "Internal Medicine"
    }])
}

async fn mount_backend(server: &MockServer, delay: Duration) {
    Mock::given(method("POST"))
        .and(path("/auth/patients/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "status": "success",
                    "data": {
                        "access_token": "jwt-flow",
                        "token_type": "bearer",
                        "patient": patient("p-42")
                    }
                }))
                .set_delay(delay),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/auth/patients/p-42"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"status": "success", "data": patient("p-42")})),
        )
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/auth/patients/p-42/doctors"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "success", "data": roster()})),
        )
        .mount(server)
        .await;
}

fn portal_for(server: &MockServer, strategy: JoinStrategy) -> (Portal, Arc<MemoryTokenStore>) {
    let mut config = PortalConfig::default();
    config.backends.auth_url = format!("{}/auth", server.uri());
    config.backends.chat_url = format!("{}/chat", server.uri());
    config.backends.feedback_url = format!("{}/feedback", server.uri());
    config.directory.join_strategy = strategy;

    let tokens = Arc::new(MemoryTokenStore::new());
    let shared: Arc<dyn TokenStore> = tokens.clone();
    (Portal::with_token_store(config, shared), tokens)
}

mod login_to_directory_flow {
    use super::*;

    #[tokio::test]
    async fn test_login_profile_and_first_entry_directory() {
        let server = MockServer::start().await;
        mount_backend(&server, Duration::from_millis(250)).await;
        let (portal, tokens) = portal_for(&server, JoinStrategy::FirstEntry);
        let mut events = portal.auth().subscribe();

        let auth = portal.auth().clone();
        let login = tokio::spawn(async move {
            auth.login(&LoginCredentials::new("patient@example.com", "password"))
                .await
        });

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(portal.auth().snapshot().await.is_loading);

        let response = login.await.unwrap().unwrap();
        assert_eq!(response.patient.id, "p-42");
        assert!(portal.auth().is_authenticated().await);
        assert_eq!(tokens.get().as_deref(), Some("jwt-flow"));
        assert!(matches!(
            events.try_recv(),
            Ok(SessionEvent::LoggedIn { patient_id }) if patient_id == "p-42"
        ));

        let profile = portal.patient().fetch_profile().await.unwrap();
        assert_eq!(profile.doctors.len(), 3);

        let rows = portal
            .patient()
            .load_directory(portal.join_strategy())
            .await
            .unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|r| r.full_name == "Dr. Amina Yusuf"));
        assert_eq!(rows[0].id, "7c1d2e3f-4a5b-4c6d-Cardiology");
        assert_eq!(rows[1].specialty.as_deref(), Some("Stroke"));
        assert_eq!(rows[2].specialty.as_deref(), Some("Internal Medicine"));
    }

    #[tokio::test]
    async fn test_strict_directory_refuses_ambiguous_roster() {
        let server = MockServer::start().await;
        mount_backend(&server, Duration::ZERO).await;
        let (portal, _tokens) = portal_for(&server, JoinStrategy::Strict);

        portal
            .auth()
            .login(&LoginCredentials::new("patient@example.com", "password"))
            .await
            .unwrap();

        let err = portal
            .patient()
            .load_directory(portal.join_strategy())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PortalError::AmbiguousDoctorJoin {
                assignments: 3,
                roster: 1
            }
        ));
    }

    #[tokio::test]
    async fn test_logout_clears_every_store() {
        let server = MockServer::start().await;
        mount_backend(&server, Duration::ZERO).await;
        let (portal, tokens) = portal_for(&server, JoinStrategy::FirstEntry);

        portal
            .auth()
            .login(&LoginCredentials::new("patient@example.com", "password"))
            .await
            .unwrap();
        portal
            .patient()
            .load_directory(JoinStrategy::FirstEntry)
            .await
            .unwrap();

        portal.logout().await;

        assert!(!portal.auth().is_authenticated().await);
        assert!(!tokens.has_token());
        let state = portal.patient().snapshot().await;
        assert!(state.profile.is_none());
        assert!(state.doctors.is_empty());
        assert!(portal
            .patient()
            .directory(JoinStrategy::FirstEntry)
            .await
            .unwrap()
            .is_empty());
    }
}

mod forced_logout_flow {
    use super::*;

    #[tokio::test]
    async fn test_expired_token_mid_session_logs_out_once() {
        let server = MockServer::start().await;
        mount_backend(&server, Duration::ZERO).await;

        Mock::given(method("PUT"))
            .and(path("/auth/patients/me/update"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Token expired"})))
            .mount(&server)
            .await;

        let (portal, tokens) = portal_for(&server, JoinStrategy::FirstEntry);
        portal
            .auth()
            .login(&LoginCredentials::new("patient@example.com", "password"))
            .await
            .unwrap();
        let mut events = portal.auth().subscribe();

        let update = ecohealth_core::ProfileUpdate {
            address: Some("2 Side St".to_string()),
            ..Default::default()
        };
        let err = portal.patient().update_profile(&update).await.unwrap_err();
        assert!(err.requires_login());

        let mut logouts = 0;
        while let Ok(event) = events.try_recv() {
            if matches!(event, SessionEvent::LoggedOut { .. }) {
                logouts += 1;
            }
        }
        assert_eq!(logouts, 1);
        assert!(!tokens.has_token());
        assert!(portal.auth().user().await.is_none());
    }

    #[tokio::test]
    async fn test_shutdown_detaches_logout() {
        let server = MockServer::start().await;
        mount_backend(&server, Duration::ZERO).await;

        Mock::given(method("GET"))
            .and(path("/auth/patients/p-42"))
            .respond_with(ResponseTemplate::new(401))
            .with_priority(1)
            .mount(&server)
            .await;

        let (portal, tokens) = portal_for(&server, JoinStrategy::FirstEntry);
        portal
            .auth()
            .login(&LoginCredentials::new("patient@example.com", "password"))
            .await
            .unwrap();

        portal.shutdown();
        assert!(portal.patient().fetch_profile().await.is_err());
        assert!(portal.auth().is_authenticated().await);
        assert!(tokens.has_token());
    }
}
