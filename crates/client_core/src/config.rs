use std::{fs, path::PathBuf};

use anyhow::{bail, Context};
use serde::Deserialize;
use shared::{domain::ExtractVariant, protocol::DEFAULT_SERVICE_URL};
use tracing::warn;
use url::Url;

pub const SETTINGS_FILE: &str = "watermark_client.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub service_url: String,
    pub request_timeout_secs: u64,
    pub extract_variant: ExtractVariant,
    pub download_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            service_url: DEFAULT_SERVICE_URL.into(),
            request_timeout_secs: 60,
            extract_variant: ExtractVariant::Match,
            download_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    service_url: Option<String>,
    request_timeout_secs: Option<u64>,
    extract_variant: Option<ExtractVariant>,
    download_dir: Option<PathBuf>,
}

impl Settings {
    pub fn service_base_url(&self) -> anyhow::Result<Url> {
        let url = Url::parse(self.service_url.trim())
            .with_context(|| format!("invalid service url '{}'", self.service_url))?;
        if !matches!(url.scheme(), "http" | "https") {
            bail!("service url must use http or https, got '{}'", url.scheme());
        }
        if url.host_str().is_none() {
            bail!("service url '{}' has no host", self.service_url);
        }
        Ok(url)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn apply_file_overrides(&mut self, raw: &str) -> anyhow::Result<()> {
        let file_cfg: FileSettings =
            toml::from_str(raw).context("failed to parse settings file")?;
        if let Some(v) = file_cfg.service_url {
            self.service_url = v;
        }
        if let Some(v) = file_cfg.request_timeout_secs {
            self.request_timeout_secs = v;
        }
        if let Some(v) = file_cfg.extract_variant {
            self.extract_variant = v;
        }
        if let Some(v) = file_cfg.download_dir {
            self.download_dir = v;
        }
        Ok(())
    }

    /// Later keys win, so `APP__*` overrides the short aliases.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        for key in ["WATERMARK_SERVICE_URL", "APP__SERVICE_URL"] {
            if let Some(v) = lookup(key) {
                self.service_url = v;
            }
        }

        if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
            match v.trim().parse::<u64>() {
                Ok(parsed) => self.request_timeout_secs = parsed,
                Err(err) => warn!("ignoring APP__REQUEST_TIMEOUT_SECS={v}: {err}"),
            }
        }

        if let Some(v) = lookup("APP__EXTRACT_VARIANT") {
            match v.parse::<ExtractVariant>() {
                Ok(parsed) => self.extract_variant = parsed,
                Err(err) => warn!("ignoring APP__EXTRACT_VARIANT: {err}"),
            }
        }

        if let Some(v) = lookup("APP__DOWNLOAD_DIR") {
            self.download_dir = PathBuf::from(v);
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(SETTINGS_FILE) {
        if let Err(err) = settings.apply_file_overrides(&raw) {
            warn!("ignoring {SETTINGS_FILE}: {err:#}");
        }
    }

    settings.apply_env_overrides(|key| std::env::var(key).ok().filter(|v| !v.trim().is_empty()));
    settings
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
