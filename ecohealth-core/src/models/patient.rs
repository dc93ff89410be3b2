use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::{null_as_default, opt_string_or_number, string_or_number};

pub const DEFAULT_NOTIFICATION_PREFERENCE: &str = "email";
pub const DEFAULT_LANGUAGE_PREFERENCE: &str = "en";

/// The logged-in patient, as returned by login, token verification and the
/// profile endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub notification_preferences: Option<String>,
    #[serde(default)]
    pub language_preferences: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub doctors: Vec<DoctorAssignment>,
    /// Fields the client does not interpret, kept so they round-trip.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Patient {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            first_name: None,
            last_name: None,
            phone_number: None,
            address: None,
            notification_preferences: None,
            language_preferences: None,
            doctors: Vec::new(),
            extra: Map::new(),
        }
    }

    pub fn full_name(&self) -> String {
        let parts: Vec<&str> = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if parts.is_empty() {
            self.email.clone()
        } else {
            parts.join(" ")
        }
    }

    pub fn notification_preference(&self) -> &str {
        self.notification_preferences
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_NOTIFICATION_PREFERENCE)
    }

    pub fn language_preference(&self) -> &str {
        self.language_preferences
            .as_deref()
            .filter(|p| !p.is_empty())
            .unwrap_or(DEFAULT_LANGUAGE_PREFERENCE)
    }
}

/// One (doctor, department) pairing on the patient profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorAssignment {
    #[serde(deserialize_with = "string_or_number")]
    pub doctor_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub department: String,
    #[serde(default)]
    pub specialty: Option<String>,
}

/// A roster entry from `GET /patients/{id}/doctors`.
///
/// The backend does not currently return an identifier; `doctor_id` is
/// honoured when present.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Doctor {
    #[serde(
        default,
        alias = "id",
        deserialize_with = "opt_string_or_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub doctor_id: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub specialty: Option<String>,
}

impl Doctor {
    pub fn has_name(&self) -> bool {
        self.full_name
            .as_deref()
            .is_some_and(|n| !n.trim().is_empty())
    }
}

/// Partial profile update. Only fields that are set are sent.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification_preferences: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language_preferences: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl ProfileUpdate {
    /// Trims text fields and drops the ones left empty. The password is
    /// kept verbatim unless it is blank.
    pub fn normalized(self) -> Self {
        fn trimmed(value: Option<String>) -> Option<String> {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        }

        Self {
            first_name: trimmed(self.first_name),
            last_name: trimmed(self.last_name),
            email: trimmed(self.email),
            phone_number: trimmed(self.phone_number),
            address: trimmed(self.address),
            notification_preferences: trimmed(self.notification_preferences),
            language_preferences: trimmed(self.language_preferences),
            password: self.password.filter(|p| !p.trim().is_empty()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.field_names().is_empty()
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        [
            ("first_name", self.first_name.is_some()),
            ("last_name", self.last_name.is_some()),
            ("email", self.email.is_some()),
            ("phone_number", self.phone_number.is_some()),
            ("address", self.address.is_some()),
            ("notification_preferences", self.notification_preferences.is_some()),
            ("language_preferences", self.language_preferences.is_some()),
            ("password", self.password.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }
}

impl fmt::Debug for ProfileUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProfileUpdate")
            .field("fields", &self.field_names())
            .finish()
    }
}

#[derive(Clone, Serialize)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

impl LoginCredentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"********")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub patient: Patient,
}

fn default_token_type() -> String {
    "bearer".to_string()
}
