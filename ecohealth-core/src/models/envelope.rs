use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::{PortalError, PortalResult};

/// `{status, message, data}` wrapper used by the auth backend. `data` stays
/// raw until the status has been checked.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound = "")]
pub struct Envelope<T> {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(skip)]
    payload: PhantomData<T>,
}

impl<T: DeserializeOwned> Envelope<T> {
    pub fn is_success(&self) -> bool {
        self.status.as_deref() == Some("success")
    }

    /// The payload, provided the envelope reports success.
    pub fn into_success(self, fallback: &str) -> PortalResult<T> {
        if !self.is_success() {
            return Err(PortalError::Rejected(fallback.to_string()));
        }
        self.into_data(fallback)
    }

    /// The payload regardless of the reported status.
    pub fn into_data(self, fallback: &str) -> PortalResult<T> {
        let data = self
            .data
            .filter(|v| !v.is_null())
            .ok_or_else(|| PortalError::Decode(fallback.to_string()))?;
        serde_json::from_value(data).map_err(|e| {
            debug!("Malformed envelope payload: {}", e);
            PortalError::Decode(fallback.to_string())
        })
    }
}

/// A payload that may or may not be wrapped in `{data: ...}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum MaybeEnveloped<T> {
    Enveloped { data: T },
    Bare(T),
}

impl<T> MaybeEnveloped<T> {
    pub fn into_inner(self) -> T {
        match self {
            MaybeEnveloped::Enveloped { data } => data,
            MaybeEnveloped::Bare(value) => value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_into_success_requires_status() {
        let envelope: Envelope<Vec<u32>> =
            serde_json::from_value(json!({"status": "error", "data": [1]})).unwrap();
        let err = envelope.into_success("Failed to fetch doctors").unwrap_err();
        assert_eq!(err.message(), "Failed to fetch doctors");

        let envelope: Envelope<Vec<u32>> =
            serde_json::from_value(json!({"status": "success", "data": [1, 2]})).unwrap();
        assert_eq!(envelope.into_success("x").unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_status_checked_before_payload_shape() {
        let envelope: Envelope<Vec<u32>> =
            serde_json::from_value(json!({"status": "error", "data": {}})).unwrap();
        let err = envelope.into_success("Failed to fetch doctors").unwrap_err();
        assert!(matches!(err, PortalError::Rejected(_)));
        assert_eq!(err.message(), "Failed to fetch doctors");

        let envelope: Envelope<Vec<u32>> =
            serde_json::from_value(json!({"status": "success", "data": {}})).unwrap();
        assert!(matches!(
            envelope.into_success("Failed to fetch doctors"),
            Err(PortalError::Decode(_))
        ));
    }

    #[test]
    fn test_missing_data_is_decode_error() {
        let envelope: Envelope<Vec<u32>> =
            serde_json::from_value(json!({"status": "success"})).unwrap();
        assert!(matches!(
            envelope.into_success("Failed to fetch profile"),
            Err(PortalError::Decode(_))
        ));
    }

    #[test]
    fn test_maybe_enveloped() {
        let wrapped: MaybeEnveloped<Vec<u32>> =
            serde_json::from_value(json!({"data": [3]})).unwrap();
        assert_eq!(wrapped.into_inner(), vec![3]);

        let bare: MaybeEnveloped<Vec<u32>> = serde_json::from_value(json!([4, 5])).unwrap();
        assert_eq!(bare.into_inner(), vec![4, 5]);
    }
}
