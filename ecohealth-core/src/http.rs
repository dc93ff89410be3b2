//! HTTP bindings to the three portal backends.
//!
//! A [`Binding`] is bound to one base URL. It attaches the persisted bearer
//! token to every request, fires the [`LogoutHook`] when a non-exempt
//! endpoint answers 401, and reports failures as a [`RequestFailure`] that
//! the services normalize into a single [`PortalError`].

use reqwest::multipart::Form;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::PortalError;
use crate::session::{LogoutHook, LogoutReason};
use crate::token::TokenStore;

/// What kind of endpoint a request targets, used to decide whether a 401
/// ends the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndpointCategory {
    Login,
    Token,
    Patient,
    Chat,
    Feedback,
}

impl EndpointCategory {
    pub fn all() -> [EndpointCategory; 5] {
        [
            EndpointCategory::Login,
            EndpointCategory::Token,
            EndpointCategory::Patient,
            EndpointCategory::Chat,
            EndpointCategory::Feedback,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointCategory::Login => "login",
            EndpointCategory::Token => "token",
            EndpointCategory::Patient => "patient",
            EndpointCategory::Chat => "chat",
            EndpointCategory::Feedback => "feedback",
        }
    }
}

impl fmt::Display for EndpointCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EndpointCategory {
    type Err = PortalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "login" => Ok(EndpointCategory::Login),
            "token" => Ok(EndpointCategory::Token),
            "patient" => Ok(EndpointCategory::Patient),
            "chat" => Ok(EndpointCategory::Chat),
            "feedback" => Ok(EndpointCategory::Feedback),
            other => Err(PortalError::InvalidConfigValue {
                key: "auto_logout.exempt".to_string(),
                message: format!("Unknown endpoint category '{}'", other),
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutoLogoutPolicy {
    exempt: Vec<EndpointCategory>,
}

impl AutoLogoutPolicy {
    pub fn new(exempt: impl IntoIterator<Item = EndpointCategory>) -> Self {
        let mut categories: Vec<EndpointCategory> = Vec::new();
        for category in exempt {
            if !categories.contains(&category) {
                categories.push(category);
            }
        }
        Self { exempt: categories }
    }

    pub fn is_exempt(&self, category: EndpointCategory) -> bool {
        self.exempt.contains(&category)
    }

    pub fn triggers_logout(&self, category: EndpointCategory) -> bool {
        !self.is_exempt(category)
    }

    pub fn exempt(&self) -> &[EndpointCategory] {
        &self.exempt
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No response was received.
    Transport,
    /// The backend answered with a non-2xx status.
    Status,
    /// A 2xx body could not be decoded.
    Decode,
}

/// Raw failure of a single request, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestFailure {
    pub kind: FailureKind,
    pub status: Option<u16>,
    /// `message` field of the error body.
    pub message: Option<String>,
    /// `detail` field of the error body, stringified when not a string.
    pub detail: Option<String>,
    pub transport: String,
}

impl RequestFailure {
    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Transport,
            status: None,
            message: None,
            detail: None,
            transport: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Decode,
            status: None,
            message: None,
            detail: None,
            transport: message.into(),
        }
    }

    /// Builds the failure for a non-2xx response from its raw body.
    pub fn from_status(status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<Value>(body).ok();

        let message = parsed
            .as_ref()
            .and_then(|v| v.get("message"))
            .and_then(text_field);
        let detail = parsed
            .as_ref()
            .and_then(|v| v.get("detail"))
            .and_then(text_field);

        Self {
            kind: FailureKind::Status,
            status: Some(status),
            message,
            detail,
            transport: format!("Request failed with status code {}", status),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(401)
    }

    /// The message a view should show: server `message`, then server
    /// `detail`, then the transport message, then `fallback`.
    pub fn best_message(&self, fallback: &str) -> String {
        [
            self.message.as_deref(),
            self.detail.as_deref(),
            Some(self.transport.as_str()),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|m| !m.is_empty())
        .unwrap_or(fallback)
        .to_string()
    }

    pub fn normalize(&self, fallback: &str) -> PortalError {
        let message = self.best_message(fallback);
        match (self.kind, self.status) {
            (_, Some(401)) => PortalError::Unauthorized(message),
            (_, Some(status)) => PortalError::Server { status, message },
            (FailureKind::Decode, None) => PortalError::Decode(message),
            _ => PortalError::Transport(message),
        }
    }
}

impl fmt::Display for RequestFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} ({})", self.best_message(""), status),
            None => write!(f, "{}", self.best_message("")),
        }
    }
}

fn text_field(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Joins a base URL and a relative path the way the portal backends expect:
/// an empty path or `/` yields `base/`, and a trailing slash on the path is
/// kept.
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{}/{}", base, path)
}

#[derive(Clone)]
pub struct Binding {
    name: String,
    base_url: String,
    client: Client,
    tokens: Arc<dyn TokenStore>,
    policy: Arc<AutoLogoutPolicy>,
    logout: LogoutHook,
}

impl Binding {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        tokens: Arc<dyn TokenStore>,
        policy: AutoLogoutPolicy,
        logout: LogoutHook,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            client: Client::new(),
            tokens,
            policy: Arc::new(policy),
            logout,
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    pub fn policy(&self) -> &AutoLogoutPolicy {
        &self.policy
    }

    pub fn url(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        category: EndpointCategory,
        path: &str,
    ) -> Result<T, RequestFailure> {
        let request = self.request(Method::GET, path);
        self.execute(category, path, request).await
    }

    /// POST without a body.
    pub async fn post<T: DeserializeOwned>(
        &self,
        category: EndpointCategory,
        path: &str,
    ) -> Result<T, RequestFailure> {
        let request = self.request(Method::POST, path);
        self.execute(category, path, request).await
    }

    pub async fn post_json<B, T>(
        &self,
        category: EndpointCategory,
        path: &str,
        body: &B,
    ) -> Result<T, RequestFailure>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::POST, path).json(body);
        self.execute(category, path, request).await
    }

    pub async fn put_json<B, T>(
        &self,
        category: EndpointCategory,
        path: &str,
        body: &B,
    ) -> Result<T, RequestFailure>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = self.request(Method::PUT, path).json(body);
        self.execute(category, path, request).await
    }

    pub async fn delete<T: DeserializeOwned>(
        &self,
        category: EndpointCategory,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, RequestFailure> {
        let mut request = self.request(Method::DELETE, path);
        if !query.is_empty() {
            request = request.query(query);
        }
        self.execute(category, path, request).await
    }

    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        category: EndpointCategory,
        path: &str,
        form: Form,
    ) -> Result<T, RequestFailure> {
        let request = self.request(Method::POST, path).multipart(form);
        self.execute(category, path, request).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self.client.request(method, self.url(path));
        match self.tokens.get() {
            Some(token) if !token.is_empty() => request.bearer_auth(token),
            _ => request,
        }
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        category: EndpointCategory,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T, RequestFailure> {
        debug!(binding = %self.name, %category, path, "Sending request");

        let response = request.send().await.map_err(|e| {
            debug!(binding = %self.name, path, "Request failed: {}", e);
            RequestFailure::transport(e.to_string())
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RequestFailure::transport(e.to_string()))?;

        if status.is_success() {
            let raw = if body.trim().is_empty() { "null" } else { body.as_str() };
            return serde_json::from_str(raw).map_err(|e| {
                debug!(binding = %self.name, path, "Undecodable response body: {}", e);
                RequestFailure::decode(e.to_string())
            });
        }

        let failure = RequestFailure::from_status(status.as_u16(), &body);
        debug!(binding = %self.name, path, status = status.as_u16(), "Request rejected: {}", failure);

        if status == StatusCode::UNAUTHORIZED && self.policy.triggers_logout(category) {
            warn!(
                binding = %self.name,
                %category,
                path,
                "Unauthorized response, forcing logout"
            );
            self.logout
                .fire(LogoutReason::Unauthorized {
                    binding: self.name.clone(),
                    category,
                    path: path.to_string(),
                })
                .await;
        }

        Err(failure)
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Binding")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://h/auth", "/patients/login"), "http://h/auth/patients/login");
        assert_eq!(join_url("http://h/auth/", "patients/1"), "http://h/auth/patients/1");
        assert_eq!(join_url("http://h/feedback", "/"), "http://h/feedback/");
        assert_eq!(join_url("http://h/feedback", ""), "http://h/feedback/");
        assert_eq!(join_url("http://h/chat", "chat/"), "http://h/chat/chat/");
    }

    #[test]
    fn test_category_parse_and_display() {
        for category in EndpointCategory::all() {
            assert_eq!(category.to_string().parse::<EndpointCategory>().unwrap(), category);
        }
        assert!("billing".parse::<EndpointCategory>().is_err());
    }

    #[test]
    fn test_policy_dedupes_and_decides() {
        let policy = AutoLogoutPolicy::new([
            EndpointCategory::Login,
            EndpointCategory::Chat,
            EndpointCategory::Login,
        ]);
        assert_eq!(policy.exempt().len(), 2);
        assert!(!policy.triggers_logout(EndpointCategory::Login));
        assert!(policy.triggers_logout(EndpointCategory::Patient));
        assert!(policy.triggers_logout(EndpointCategory::Token));
    }

    #[test]
    fn test_failure_prefers_message_then_detail() {
        let failure = RequestFailure::from_status(400, r#"{"message":"Bad email","detail":"x"}"#);
        assert_eq!(failure.best_message("fallback"), "Bad email");

        let failure = RequestFailure::from_status(400, r#"{"message":"","detail":"Invalid credentials"}"#);
        assert_eq!(failure.best_message("fallback"), "Invalid credentials");

        let failure = RequestFailure::from_status(502, "<html>bad gateway</html>");
        assert_eq!(failure.best_message("fallback"), "Request failed with status code 502");

        let failure = RequestFailure::transport("");
        assert_eq!(failure.best_message("Login failed"), "Login failed");
    }

    #[test]
    fn test_structured_detail_is_stringified() {
        let failure =
            RequestFailure::from_status(422, r#"{"detail":[{"loc":["body","email"],"msg":"field required"}]}"#);
        let detail = failure.detail.clone().unwrap();
        assert!(detail.contains("field required"));
    }

    #[test]
    fn test_normalize_maps_kinds() {
        let err = RequestFailure::from_status(401, r#"{"detail":"Invalid credentials"}"#).normalize("Login failed");
        assert!(matches!(err, PortalError::Unauthorized(ref m) if m == "Invalid credentials"));

        let err = RequestFailure::from_status(500, "{}").normalize("x");
        assert!(matches!(err, PortalError::Server { status: 500, .. }));

        let err = RequestFailure::transport("connection refused").normalize("x");
        assert!(matches!(err, PortalError::Transport(ref m) if m == "connection refused"));

        let err = RequestFailure::decode("expected value").normalize("x");
        assert!(matches!(err, PortalError::Decode(_)));
    }
}
