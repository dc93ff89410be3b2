//! Explicit construction of the whole client: bindings, services and stores
//! wired to one token store and one logout hook.

use std::sync::Arc;
use tracing::{debug, info};

use crate::config::PortalConfig;
use crate::directory::JoinStrategy;
use crate::error::PortalResult;
use crate::http::{AutoLogoutPolicy, Binding};
use crate::services::{AuthService, ChatService, FeedbackService, PatientService};
use crate::session::{LogoutHook, SessionAccess};
use crate::stores::{AuthStore, ChatStore, FeedbackStore, PatientStore};
use crate::token::{FileTokenStore, TokenStore};

pub struct Portal {
    config: PortalConfig,
    tokens: Arc<dyn TokenStore>,
    hook: LogoutHook,
    auth: Arc<AuthStore>,
    patient: PatientStore,
    chat: ChatStore,
    feedback: FeedbackStore,
}

impl Portal {
    /// Builds a portal whose token lives in the configured session file.
    pub fn new(config: PortalConfig) -> PortalResult<Self> {
        config.validate()?;
        let path = config.token_path()?;
        debug!(path = %path.display(), "Using token file");
        let tokens: Arc<dyn TokenStore> =
            Arc::new(FileTokenStore::new(path, config.session.token_key.clone()));
        Ok(Self::with_token_store(config, tokens))
    }

    pub fn with_token_store(config: PortalConfig, tokens: Arc<dyn TokenStore>) -> Self {
        let hook = LogoutHook::new();
        let policy = AutoLogoutPolicy::new(config.auto_logout.exempt.iter().copied());

        let binding = |name: &str, base_url: &str| {
            Binding::new(name, base_url, tokens.clone(), policy.clone(), hook.clone())
        };
        let auth_binding = binding("auth", &config.backends.auth_url);
        let chat_binding = binding("chat", &config.backends.chat_url);
        let feedback_binding = binding("feedback", &config.backends.feedback_url);

        let auth = Arc::new(AuthStore::new(AuthService::new(auth_binding.clone())));
        let session: Arc<dyn SessionAccess> = auth.clone();
        hook.attach(&session);

        let patient = PatientStore::new(PatientService::new(auth_binding), session);
        let chat = ChatStore::new(ChatService::new(chat_binding));
        let feedback = FeedbackStore::new(FeedbackService::new(feedback_binding));

        info!(
            auth = %config.backends.auth_url,
            chat = %config.backends.chat_url,
            feedback = %config.backends.feedback_url,
            "Portal ready"
        );

        Self {
            config,
            tokens,
            hook,
            auth,
            patient,
            chat,
            feedback,
        }
    }

    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    pub fn auth(&self) -> &Arc<AuthStore> {
        &self.auth
    }

    pub fn patient(&self) -> &PatientStore {
        &self.patient
    }

    pub fn chat(&self) -> &ChatStore {
        &self.chat
    }

    pub fn feedback(&self) -> &FeedbackStore {
        &self.feedback
    }

    pub fn join_strategy(&self) -> JoinStrategy {
        self.config.directory.join_strategy
    }

    /// Ends the session and drops every store's cached data.
    pub async fn logout(&self) {
        self.auth.logout().await;
        self.patient.clear_all().await;
        self.chat.clear_messages().await;
        self.chat.clear_current_chat().await;
        self.feedback.clear_feedback().await;
        self.feedback.clear_feedbacks().await;
    }

    /// Detaches the logout hook so in-flight requests can no longer end the
    /// session.
    pub fn shutdown(&self) {
        self.hook.detach();
        debug!("Portal shut down");
    }
}

impl Drop for Portal {
    fn drop(&mut self) {
        self.hook.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::MemoryTokenStore;

    #[tokio::test]
    async fn test_portal_wires_hook_to_auth_store() {
        let portal = Portal::with_token_store(
            PortalConfig::default(),
            Arc::new(MemoryTokenStore::with_token("jwt")),
        );
        assert!(portal.hook.is_attached());
        assert_eq!(portal.join_strategy(), JoinStrategy::Strict);

        portal.shutdown();
        assert!(!portal.hook.is_attached());
    }

    #[tokio::test]
    async fn test_logout_clears_token() {
        let portal = Portal::with_token_store(
            PortalConfig::default(),
            Arc::new(MemoryTokenStore::with_token("jwt")),
        );
        portal.logout().await;
        assert!(!portal.tokens().has_token());
        assert!(!portal.auth().is_authenticated().await);
    }

    #[test]
    fn test_new_uses_configured_token_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = PortalConfig::default();
        config.session.token_file = dir.path().join("session.json").display().to_string();

        let portal = Portal::new(config).unwrap();
        portal.tokens().set("abc").unwrap();
        assert!(dir.path().join("session.json").exists());
    }
}
