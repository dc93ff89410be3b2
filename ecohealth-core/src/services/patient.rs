use tracing::debug;

use crate::error::PortalResult;
use crate::http::{Binding, EndpointCategory};
use crate::models::{Doctor, Envelope, Patient, ProfileUpdate};

const DOCTORS_FAILED: &str = "Failed to fetch doctors";
const PROFILE_FAILED: &str = "Failed to fetch profile";
const UPDATE_FAILED: &str = "Failed to update profile";

/// Patient endpoints, served by the auth backend.
#[derive(Debug, Clone)]
pub struct PatientService {
    binding: Binding,
}

impl PatientService {
    pub fn new(binding: Binding) -> Self {
        Self { binding }
    }

    pub async fn get_doctors(&self, patient_id: &str) -> PortalResult<Vec<Doctor>> {
        let path = format!("/patients/{}/doctors", patient_id);
        let envelope: Envelope<Vec<Doctor>> = self
            .binding
            .get(EndpointCategory::Patient, &path)
            .await
            .map_err(|f| f.normalize(DOCTORS_FAILED))?;
        let doctors = envelope.into_success(DOCTORS_FAILED)?;
        debug!(patient_id, count = doctors.len(), "Fetched doctor roster");
        Ok(doctors)
    }

    pub async fn get_profile(&self, patient_id: &str) -> PortalResult<Patient> {
        let path = format!("/patients/{}", patient_id);
        let envelope: Envelope<Patient> = self
            .binding
            .get(EndpointCategory::Patient, &path)
            .await
            .map_err(|f| f.normalize(PROFILE_FAILED))?;
        envelope.into_success(PROFILE_FAILED)
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> PortalResult<Patient> {
        debug!(fields = ?update.field_names(), "Updating profile");
        let envelope: Envelope<Patient> = self
            .binding
            .put_json(EndpointCategory::Patient, "/patients/me/update", update)
            .await
            .map_err(|f| f.normalize(UPDATE_FAILED))?;
        envelope.into_success(UPDATE_FAILED)
    }
}
