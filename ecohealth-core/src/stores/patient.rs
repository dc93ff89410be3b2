use serde::Serialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::directory::{merge_doctors, DoctorRow, JoinStrategy};
use crate::error::{PortalError, PortalResult};
use crate::models::{Doctor, Patient, ProfileUpdate};
use crate::services::PatientService;
use crate::session::SessionAccess;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PatientState {
    pub doctors: Vec<Doctor>,
    pub profile: Option<Patient>,
    pub loading: bool,
    pub error: Option<String>,
    pub is_updating: bool,
}

/// Doctor roster and profile of the session's patient.
///
/// The patient id comes from the session on every call, so the store never
/// holds a stale copy of it.
pub struct PatientStore {
    service: PatientService,
    session: Arc<dyn SessionAccess>,
    state: RwLock<PatientState>,
}

impl PatientStore {
    pub fn new(service: PatientService, session: Arc<dyn SessionAccess>) -> Self {
        Self {
            service,
            session,
            state: RwLock::new(PatientState::default()),
        }
    }

    pub async fn snapshot(&self) -> PatientState {
        self.state.read().await.clone()
    }

    async fn begin_loading(&self) {
        let mut state = self.state.write().await;
        state.loading = true;
        state.error = None;
    }

    async fn fail_loading(&self, error: &PortalError) {
        let mut state = self.state.write().await;
        state.loading = false;
        state.error = Some(error.message());
    }

    async fn patient_id(&self) -> PortalResult<String> {
        self.session
            .current_patient_id()
            .await
            .ok_or(PortalError::NotAuthenticated)
    }

    pub async fn fetch_doctors(&self) -> PortalResult<Vec<Doctor>> {
        self.begin_loading().await;

        let result = match self.patient_id().await {
            Ok(id) => self.service.get_doctors(&id).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(doctors) => {
                let mut state = self.state.write().await;
                state.doctors = doctors.clone();
                state.loading = false;
                state.error = None;
                Ok(doctors)
            }
            Err(e) => {
                self.fail_loading(&e).await;
                Err(e)
            }
        }
    }

    pub async fn fetch_profile(&self) -> PortalResult<Patient> {
        self.begin_loading().await;

        let result = match self.patient_id().await {
            Ok(id) => self.service.get_profile(&id).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(profile) => {
                let mut state = self.state.write().await;
                state.profile = Some(profile.clone());
                state.loading = false;
                state.error = None;
                Ok(profile)
            }
            Err(e) => {
                self.fail_loading(&e).await;
                Err(e)
            }
        }
    }

    /// Sends the update and hands the returned patient to the session as
    /// well as keeping it as the profile.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> PortalResult<Patient> {
        {
            let mut state = self.state.write().await;
            state.is_updating = true;
            state.error = None;
        }

        match self.service.update_profile(update).await {
            Ok(patient) => {
                self.session.replace_user(patient.clone()).await;
                let mut state = self.state.write().await;
                state.profile = Some(patient.clone());
                state.is_updating = false;
                state.error = None;
                Ok(patient)
            }
            Err(e) => {
                let mut state = self.state.write().await;
                state.is_updating = false;
                state.error = Some(e.message());
                Err(e)
            }
        }
    }

    /// Fetches roster and profile together, then merges them.
    pub async fn load_directory(&self, strategy: JoinStrategy) -> PortalResult<Vec<DoctorRow>> {
        let (doctors, profile) = tokio::join!(self.fetch_doctors(), self.fetch_profile());
        doctors?;
        profile?;
        self.directory(strategy).await
    }

    /// Display rows from the current roster and profile. Empty until a
    /// profile has been fetched.
    pub async fn directory(&self, strategy: JoinStrategy) -> PortalResult<Vec<DoctorRow>> {
        let state = self.state.read().await;
        let Some(profile) = state.profile.as_ref() else {
            debug!("No profile loaded, directory is empty");
            return Ok(Vec::new());
        };
        merge_doctors(&profile.doctors, &state.doctors, strategy)
    }

    pub async fn clear_error(&self) {
        self.state.write().await.error = None;
    }

    pub async fn clear_all(&self) {
        *self.state.write().await = PatientState::default();
    }
}
