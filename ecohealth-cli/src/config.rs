use anyhow::{Context, Result};
use ecohealth_core::{JoinStrategy, Portal, PortalConfig};

#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub portal: PortalConfig,
}

impl CliConfig {
    pub fn load() -> Result<Self> {
        let portal = PortalConfig::load().context(
            "Failed to load EcoHealth configuration.\n\
             Set ECOHEALTH_AUTH_URL, ECOHEALTH_CHAT_URL and ECOHEALTH_FEEDBACK_URL,\n\
             or create ecohealth.toml with a [backends] section",
        )?;
        Ok(Self { portal })
    }

    pub fn join_strategy(&self) -> JoinStrategy {
        self.portal.directory.join_strategy
    }

    pub fn chat_languages(&self) -> (&str, &str) {
        (
            &self.portal.chat.source_language,
            &self.portal.chat.target_language,
        )
    }

    /// Builds the portal and restores any persisted session.
    pub async fn open_portal(&self) -> Result<Portal> {
        let portal = Portal::new(self.portal.clone())?;
        portal.auth().initialize().await;
        Ok(portal)
    }
}
