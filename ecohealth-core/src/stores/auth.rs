use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::error::PortalResult;
use crate::models::{LoginCredentials, LoginResponse, Patient};
use crate::services::AuthService;
use crate::session::{LogoutReason, SessionAccess, SessionEvent};

const EVENT_CAPACITY: usize = 32;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuthState {
    pub user: Option<Patient>,
    pub is_loading: bool,
    pub is_auth_loading: bool,
    pub error: Option<String>,
}

impl AuthState {
    /// Derived from the user record; never stored on its own.
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }
}

/// Holds the session and implements [`SessionAccess`] for the other stores
/// and the bindings.
pub struct AuthStore {
    service: AuthService,
    state: RwLock<AuthState>,
    events: broadcast::Sender<SessionEvent>,
}

impl AuthStore {
    pub fn new(service: AuthService) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            service,
            state: RwLock::new(AuthState::default()),
            events,
        }
    }

    pub async fn snapshot(&self) -> AuthState {
        self.state.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.state.read().await.is_authenticated()
    }

    pub async fn user(&self) -> Option<Patient> {
        self.state.read().await.user.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: SessionEvent) {
        // No receivers is the normal case for one-shot commands.
        let _ = self.events.send(event);
    }

    /// Restores the session from a persisted token, if there is one.
    pub async fn initialize(&self) {
        self.state.write().await.is_auth_loading = true;

        if self.service.has_token() {
            self.check_auth().await;
        } else {
            self.state.write().await.is_auth_loading = false;
        }
    }

    pub async fn check_auth(&self) -> bool {
        if self.is_authenticated().await {
            return true;
        }

        self.state.write().await.is_auth_loading = true;

        if !self.service.has_token() {
            let mut state = self.state.write().await;
            state.user = None;
            state.is_auth_loading = false;
            return false;
        }

        match self.service.validate_token().await {
            Ok(user) => {
                let patient_id = user.id.clone();
                {
                    let mut state = self.state.write().await;
                    state.user = Some(user);
                    state.is_auth_loading = false;
                }
                info!(patient_id = %patient_id, "Session restored");
                self.emit(SessionEvent::LoggedIn { patient_id });
                true
            }
            Err(e) => {
                debug!("Stored session rejected: {}", e);
                let mut state = self.state.write().await;
                state.user = None;
                state.is_auth_loading = false;
                false
            }
        }
    }

    pub async fn login(&self, credentials: &LoginCredentials) -> PortalResult<LoginResponse> {
        {
            let mut state = self.state.write().await;
            state.is_loading = true;
            state.error = None;
        }

        match self.service.login(credentials).await {
            Ok(response) => {
                let patient_id = response.patient.id.clone();
                {
                    let mut state = self.state.write().await;
                    state.user = Some(response.patient.clone());
                    state.is_loading = false;
                    state.error = None;
                }
                self.emit(SessionEvent::LoggedIn { patient_id });
                Ok(response)
            }
            Err(e) => {
                e.log();
                let mut state = self.state.write().await;
                state.is_loading = false;
                state.error = Some(e.message());
                Err(e)
            }
        }
    }

    pub async fn logout(&self) {
        self.logout_with(LogoutReason::UserRequested).await;
    }

    /// Local state clears even when dropping the token fails. Only the call
    /// that ends an actual session emits [`SessionEvent::LoggedOut`].
    pub async fn logout_with(&self, reason: LogoutReason) {
        if let Err(e) = self.service.logout() {
            debug!("Ignoring logout failure: {}", e);
        }

        let was_authenticated = {
            let mut state = self.state.write().await;
            let was_authenticated = state.user.take().is_some();
            state.error = None;
            state.is_auth_loading = false;
            was_authenticated
        };

        if !was_authenticated {
            debug!(%reason, "No session to end");
            return;
        }

        info!(%reason, "Logged out");
        self.emit(SessionEvent::LoggedOut { reason });
    }

    pub async fn clear_error(&self) {
        self.state.write().await.error = None;
    }

    pub async fn set_user(&self, user: Option<Patient>) {
        let patient_id = user.as_ref().map(|u| u.id.clone());
        self.state.write().await.user = user;
        if let Some(patient_id) = patient_id {
            self.emit(SessionEvent::UserReplaced { patient_id });
        }
    }
}

#[async_trait]
impl SessionAccess for AuthStore {
    async fn current_patient_id(&self) -> Option<String> {
        self.state
            .read()
            .await
            .user
            .as_ref()
            .map(|u| u.id.clone())
            .filter(|id| !id.is_empty())
    }

    async fn replace_user(&self, patient: Patient) {
        self.set_user(Some(patient)).await;
    }

    async fn force_logout(&self, reason: LogoutReason) {
        warn!(%reason, "Session ended by the server");
        self.logout_with(reason).await;
    }
}
