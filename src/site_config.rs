//! Site metadata file (`meta-space-config.yml`) generation.
//!
//! The backend sends the user/site/theme/gateway/metadata fields with the
//! task; this module serializes them to a human-readable YAML file at the
//! root of a target directory so the static-site pipeline and gateway can
//! discover how the space is configured.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const SITE_CONFIG_FILE_NAME: &str = "meta-space-config.yml";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFields {
    pub username: String,
    #[serde(default)]
    pub nickname: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteFields {
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub favicon: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeFields {
    pub theme_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayFields {
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataFields {
    pub storage_type: String,
    #[serde(default)]
    pub data_ref: Option<String>,
}

/// The structured fields the metadata file is generated from, exactly as
/// they arrive in the task payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfigFields {
    pub user: UserFields,
    pub site: SiteFields,
    pub theme: ThemeFields,
    #[serde(default)]
    pub gateway: Option<GatewayFields>,
    #[serde(default)]
    pub metadata: Option<MetadataFields>,
}

/// Serialize the fields to `meta-space-config.yml` at the root of `dir`.
pub fn write_site_config(fields: &SiteConfigFields, dir: &Path) -> Result<()> {
    let yaml = serde_yaml::to_string(fields).context("Failed to serialize site config")?;
    let path = dir.join(SITE_CONFIG_FILE_NAME);
    log::info!("Writing site config to {}", path.display());
    std::fs::write(&path, yaml)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
