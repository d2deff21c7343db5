// SPDX-License-Identifier: GPL-3.0-or-later
use std::path::Path;

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use refrain_domain::{ClientType, Credentials, MatchType, MatchTypes, SearchMode};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CredentialsConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl CredentialsConfig {
    /// Both halves of the pair, if configured and non-empty.
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.client_id, &self.client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => {
                Some(Credentials::new(id.clone(), secret.clone()))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub client_type: ClientType,
    pub mode: SearchMode,
    pub match_types: Vec<MatchType>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            client_type: ClientType::PexSearch,
            mode: SearchMode::Default,
            match_types: MatchType::ALL.to_vec(),
        }
    }
}

impl SearchConfig {
    pub fn match_mask(&self) -> MatchTypes {
        MatchTypes::from_types(&self.match_types)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub credentials: CredentialsConfig,
    pub search: SearchConfig,
}

/// Load configuration from defaults, optional TOML file, and environment overrides (prefix: REFRAIN_).
pub fn load(config_path: Option<&Path>) -> Result<AppConfig> {
    let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

    if let Some(path) = config_path {
        figment = figment.merge(Toml::file(path));
    }

    figment = figment.merge(Env::prefixed("REFRAIN_").split("__"));

    let config: AppConfig = figment.extract()?;
    info!(target: "config", "configuration loaded");
    Ok(config)
}
