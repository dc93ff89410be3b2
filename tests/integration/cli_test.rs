use serde_json::{json, Value};
use std::path::Path;
use std::process::Output;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BINARY: &str = env!("CARGO_BIN_EXE_ecohealth");

/// Isolated home, config and data directories so a developer's own session
/// never leaks into a test run.
struct Sandbox {
    dir: TempDir,
    auth_url: String,
    chat_url: String,
    feedback_url: String,
}

impl Sandbox {
    fn new(base_url: &str) -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create sandbox"),
            auth_url: format!("{}/auth", base_url),
            chat_url: format!("{}/chat", base_url),
            feedback_url: format!("{}/feedback", base_url),
        }
    }

    fn offline() -> Self {
        Self::new("http://127.0.0.1:9")
    }

    fn token_file(&self) -> std::path::PathBuf {
        self.dir.path().join("session.json")
    }

    fn command(&self, args: &[&str]) -> tokio::process::Command {
        let root = self.dir.path();
        let mut cmd = tokio::process::Command::new(BINARY);
        cmd.args(args)
            .current_dir(root)
            .env("HOME", root)
            .env("XDG_CONFIG_HOME", root.join("config"))
            .env("XDG_DATA_HOME", root.join("data"))
            .env("ECOHEALTH_AUTH_URL", &self.auth_url)
            .env("ECOHEALTH_CHAT_URL", &self.chat_url)
            .env("ECOHEALTH_FEEDBACK_URL", &self.feedback_url)
            .env("ECOHEALTH_TOKEN_FILE", self.token_file())
            .env("NO_COLOR", "1")
            .env_remove("RUST_LOG")
            .env_remove("ECOHEALTH_LOG_LEVEL")
            .env_remove("ECOHEALTH_EMAIL")
            .env_remove("ECOHEALTH_PASSWORD");
        cmd
    }

    async fn run(&self, args: &[&str]) -> Output {
        self.command(args)
            .output()
            .await
            .expect("Failed to execute ecohealth command")
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

fn stored_token(path: &Path) -> Option<String> {
    let raw = std::fs::read_to_string(path).ok()?;
    let entries: Value = serde_json::from_str(&raw).ok()?;
    entries["token"].as_str().map(str::to_string)
}

mod version_command_tests {
    use super::*;

    #[tokio::test]
    async fn test_version_command_basic() {
        let output = Sandbox::offline().run(&["version"]).await;
        let out = stdout(&output);

        assert!(output.status.success(), "version command should succeed");
        assert!(out.contains("ecohealth"), "output should contain 'ecohealth'");
        assert!(out.contains("0.1.0"), "output should contain version number");
    }

    #[tokio::test]
    async fn test_version_command_detailed() {
        let output = Sandbox::offline().run(&["version", "--detailed"]).await;
        let out = stdout(&output);

        assert!(output.status.success(), "version --detailed should succeed");
        assert!(out.contains("Version"));
        assert!(out.contains("Apache-2.0"));
        assert!(out.contains("Backends"));
    }
}

mod help_command_tests {
    use super::*;

    #[tokio::test]
    async fn test_help_lists_commands() {
        let output = Sandbox::offline().run(&["--help"]).await;
        let out = stdout(&output);

        assert!(output.status.success(), "--help should succeed");
        for command in ["login", "logout", "status", "doctors", "profile", "feedback", "chat"] {
            assert!(out.contains(command), "help should mention {}", command);
        }
    }

    #[tokio::test]
    async fn test_unknown_command_fails() {
        let output = Sandbox::offline().run(&["appointments"]).await;
        assert!(!output.status.success());
    }
}

mod validation_tests {
    use super::*;

    #[tokio::test]
    async fn test_login_rejects_malformed_email() {
        let output = Sandbox::offline()
            .run(&["login", "--email", "not-an-email", "--password", "secret"])
            .await;

        assert!(!output.status.success());
        assert!(stderr(&output).contains("Please enter a valid email address"));
    }

    #[tokio::test]
    async fn test_empty_feedback_rejected_before_sending() {
        let output = Sandbox::offline().run(&["feedback", "submit"]).await;

        assert!(!output.status.success());
        assert!(stderr(&output).contains("Please provide at least one type of feedback"));
    }

    #[tokio::test]
    async fn test_feedback_emoji_outside_palette() {
        let output = Sandbox::offline()
            .run(&["feedback", "submit", "--emoji", "🦀"])
            .await;

        assert!(!output.status.success());
    }

    #[tokio::test]
    async fn test_chat_delete_needs_scope() {
        let output = Sandbox::offline().run(&["chat", "delete"]).await;

        assert!(!output.status.success());
        assert!(stderr(&output).contains("--all"));
    }

    #[tokio::test]
    async fn test_doctors_without_session() {
        let output = Sandbox::offline().run(&["doctors"]).await;
        let err = stderr(&output);

        assert!(!output.status.success());
        assert!(err.contains("User not authenticated"));
        assert!(err.contains("ecohealth login"));
    }

    #[tokio::test]
    async fn test_status_without_session() {
        let output = Sandbox::offline().run(&["status", "--format", "json"]).await;
        assert!(output.status.success());

        let status: Value = serde_json::from_str(&stdout(&output)).unwrap();
        assert_eq!(status["authenticated"], false);
        assert_eq!(status["backends"]["auth"], "http://127.0.0.1:9/auth");
    }
}

mod session_flow_tests {
    use super::*;

    fn patient() -> Value {
        json!({
            "id": "p-7",
            "email": "patient@example.com",
            "first_name": "Pat",
            "last_name": "Doe",
            "doctors": [
                {"doctor_id": "7c1d2e3f-4a5b", "department": "Cardiology"},
                {"doctor_id": "9a8b7c6d-5e4f", "department": "Neurology"}
            ]
        })
    }

    async fn mount_auth_backend(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/auth/patients/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": {"access_token": "jwt-cli", "token_type": "bearer", "patient": patient()}
            })))
            .mount(server)
            .await;

        Mock::given(method("POST"))
            .and(path("/auth/verify-token"))
            .and(header("authorization", "Bearer jwt-cli"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "success", "data": patient()})),
            )
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/auth/patients/p-7"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"status": "success", "data": patient()})),
            )
            .mount(server)
            .await;

        Mock::given(method("GET"))
            .and(path("/auth/patients/p-7/doctors"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "success",
                "data": [{"full_name": "Dr. Lena Ortiz", "phone": "612999888"}]
            })))
            .mount(server)
            .await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_login_status_doctors_logout() {
        let server = MockServer::start().await;
        mount_auth_backend(&server).await;
        let sandbox = Sandbox::new(&server.uri());

        let output = sandbox
            .run(&["login", "--email", "patient@example.com", "--password", "password"])
            .await;
        assert!(output.status.success(), "login failed: {}", stderr(&output));
        assert!(stdout(&output).contains("Welcome, Pat Doe!"));
        assert_eq!(stored_token(&sandbox.token_file()).as_deref(), Some("jwt-cli"));

        let output = sandbox.run(&["status", "--format", "json"]).await;
        let status: Value = serde_json::from_str(&stdout(&output)).unwrap();
        assert_eq!(status["authenticated"], true);
        assert_eq!(status["user"]["id"], "p-7");

        let output = sandbox
            .run(&["doctors", "list", "--join", "first-entry", "--format", "json"])
            .await;
        assert!(output.status.success(), "doctors failed: {}", stderr(&output));
        let rows: Value = serde_json::from_str(&stdout(&output)).unwrap();
        let rows = rows.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r["full_name"] == "Dr. Lena Ortiz"));

        let output = sandbox.run(&["logout"]).await;
        assert!(output.status.success());
        assert!(stored_token(&sandbox.token_file()).is_none());

        let output = sandbox.run(&["status", "--format", "json"]).await;
        let status: Value = serde_json::from_str(&stdout(&output)).unwrap();
        assert_eq!(status["authenticated"], false);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rejected_login_reports_server_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/patients/login"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"detail": "Invalid credentials"})),
            )
            .mount(&server)
            .await;
        let sandbox = Sandbox::new(&server.uri());

        let output = sandbox
            .run(&["login", "--email", "patient@example.com", "--password", "wrong"])
            .await;

        assert!(!output.status.success());
        assert!(stderr(&output).contains("Invalid credentials"));
        assert!(stored_token(&sandbox.token_file()).is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rating_only_feedback_from_cli() {
        let server = MockServer::start().await;
        mount_auth_backend(&server).await;
        Mock::given(method("POST"))
            .and(path("/feedback/"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "f-1", "star_rating": 4})))
            .expect(1)
            .mount(&server)
            .await;
        let sandbox = Sandbox::new(&server.uri());

        sandbox
            .run(&["login", "--email", "patient@example.com", "--password", "password"])
            .await;
        let output = sandbox.run(&["feedback", "submit", "--rating", "4"]).await;

        assert!(output.status.success(), "feedback failed: {}", stderr(&output));
        assert!(stdout(&output).contains("Thank you for your feedback!"));
    }
}
