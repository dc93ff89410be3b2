//! Contract between the session holder and everything that needs to read
//! or end the session.
//!
//! The auth store implements [`SessionAccess`]. The patient store uses it to
//! read the current patient id and to publish an updated patient record,
//! and the HTTP bindings reach it through a [`LogoutHook`] to force a
//! logout on 401 responses.

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use std::sync::{Arc, RwLock, Weak};
use tracing::debug;

use crate::http::EndpointCategory;
use crate::models::Patient;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogoutReason {
    /// The user asked to log out.
    UserRequested,
    /// A binding received a 401 on a non-exempt endpoint.
    Unauthorized {
        binding: String,
        category: EndpointCategory,
        path: String,
    },
    /// The persisted token failed validation.
    TokenRejected,
}

impl fmt::Display for LogoutReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogoutReason::UserRequested => write!(f, "user requested"),
            LogoutReason::Unauthorized {
                binding,
                category,
                path,
            } => write!(f, "401 from {} backend ({} {})", binding, category, path),
            LogoutReason::TokenRejected => write!(f, "token rejected"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    LoggedIn { patient_id: String },
    LoggedOut { reason: LogoutReason },
    UserReplaced { patient_id: String },
}

#[async_trait]
pub trait SessionAccess: Send + Sync {
    async fn current_patient_id(&self) -> Option<String>;

    async fn replace_user(&self, patient: Patient);

    async fn force_logout(&self, reason: LogoutReason);
}

/// Late-bound, non-owning link from the bindings to the session holder.
///
/// Bindings are built before the auth store exists, so the hook starts
/// empty and is attached once the store is constructed. It holds a weak
/// reference, which keeps the store and its bindings free of cycles.
#[derive(Clone, Default)]
pub struct LogoutHook {
    target: Arc<RwLock<Option<Weak<dyn SessionAccess>>>>,
}

impl LogoutHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&self, session: &Arc<dyn SessionAccess>) {
        let weak = Arc::downgrade(session);
        match self.target.write() {
            Ok(mut target) => *target = Some(weak),
            Err(poisoned) => *poisoned.into_inner() = Some(weak),
        }
    }

    pub fn detach(&self) {
        match self.target.write() {
            Ok(mut target) => *target = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.session().is_some()
    }

    fn session(&self) -> Option<Arc<dyn SessionAccess>> {
        let target = match self.target.read() {
            Ok(target) => target.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        target.and_then(|weak| weak.upgrade())
    }

    /// Returns whether a session was there to receive the logout.
    pub async fn fire(&self, reason: LogoutReason) -> bool {
        match self.session() {
            Some(session) => {
                session.force_logout(reason).await;
                true
            }
            None => {
                debug!("Logout hook fired with no session attached ({})", reason);
                false
            }
        }
    }
}

impl fmt::Debug for LogoutHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogoutHook")
            .field("attached", &self.is_attached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSession {
        logouts: AtomicUsize,
    }

    #[async_trait]
    impl SessionAccess for CountingSession {
        async fn current_patient_id(&self) -> Option<String> {
            None
        }

        async fn replace_user(&self, _patient: Patient) {}

        async fn force_logout(&self, _reason: LogoutReason) {
            self.logouts.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn test_hook_without_session() {
        let hook = LogoutHook::new();
        assert!(!hook.is_attached());
        assert!(!hook.fire(LogoutReason::UserRequested).await);
    }

    #[tokio::test]
    async fn test_hook_forwards_to_session() {
        let concrete = Arc::new(CountingSession::default());
        let session: Arc<dyn SessionAccess> = concrete.clone();
        let hook = LogoutHook::new();
        hook.attach(&session);

        assert!(hook.fire(LogoutReason::TokenRejected).await);
        assert_eq!(concrete.logouts.load(Ordering::SeqCst), 1);

        hook.detach();
        assert!(!hook.fire(LogoutReason::TokenRejected).await);
        assert_eq!(concrete.logouts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_hook_does_not_keep_session_alive() {
        let session: Arc<dyn SessionAccess> = Arc::new(CountingSession::default());
        let hook = LogoutHook::new();
        hook.attach(&session);
        drop(session);

        assert!(!hook.is_attached());
    }

    #[test]
    fn test_logout_reason_display() {
        let reason = LogoutReason::Unauthorized {
            binding: "auth".to_string(),
            category: EndpointCategory::Patient,
            path: "/patients/1".to_string(),
        };
        assert_eq!(reason.to_string(), "401 from auth backend (patient /patients/1)");
    }
}
