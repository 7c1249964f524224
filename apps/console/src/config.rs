use std::{fs, path::Path, time::Duration};

use anyhow::{anyhow, Context};
use client_core::{ApiOptions, DisplayMode, SummaryEndpoint};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "voice_console.toml";
const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub base_url: String,
    pub conversation_endpoint: SummaryEndpoint,
    pub request_timeout_secs: Option<u64>,
    pub display_mode: DisplayMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            conversation_endpoint: SummaryEndpoint::Conversations,
            request_timeout_secs: None,
            display_mode: DisplayMode::Strict,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    base_url: Option<String>,
    conversation_endpoint: Option<SummaryEndpoint>,
    request_timeout_secs: Option<u64>,
    display_mode: Option<DisplayMode>,
}

/// Defaults, then the config file, then the environment.
///
/// An explicitly named file must exist; the default file is optional.
pub fn load_settings(explicit_path: Option<&Path>) -> anyhow::Result<Settings> {
    let mut settings = Settings::default();

    match explicit_path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file '{}'", path.display()))?;
            settings
                .apply_file(&raw)
                .with_context(|| format!("invalid config file '{}'", path.display()))?;
        }
        None => {
            if let Ok(raw) = fs::read_to_string(DEFAULT_CONFIG_FILE) {
                settings
                    .apply_file(&raw)
                    .with_context(|| format!("invalid config file '{DEFAULT_CONFIG_FILE}'"))?;
            }
        }
    }

    settings.apply_env(|key| std::env::var(key).ok())?;
    Ok(settings)
}

impl Settings {
    pub(crate) fn apply_file(&mut self, raw: &str) -> anyhow::Result<()> {
        let file: FileSettings = toml::from_str(raw)?;
        if let Some(v) = file.base_url {
            self.base_url = normalize_base_url(&v);
        }
        if let Some(v) = file.conversation_endpoint {
            self.conversation_endpoint = v;
        }
        if let Some(v) = file.request_timeout_secs {
            self.request_timeout_secs = Some(v);
        }
        if let Some(v) = file.display_mode {
            self.display_mode = v;
        }
        Ok(())
    }

    pub(crate) fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<()> {
        if let Some(v) = lookup("VOICE_AGENT_BASE_URL") {
            self.base_url = normalize_base_url(&v);
        }
        if let Some(v) = lookup("APP__BASE_URL") {
            self.base_url = normalize_base_url(&v);
        }

        if let Some(v) = lookup("APP__CONVERSATION_ENDPOINT") {
            self.conversation_endpoint = v
                .parse()
                .map_err(|err: String| anyhow!(err))
                .context("APP__CONVERSATION_ENDPOINT")?;
        }

        if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
            let parsed = v
                .trim()
                .parse::<u64>()
                .with_context(|| format!("APP__REQUEST_TIMEOUT_SECS must be a number, got '{v}'"))?;
            self.request_timeout_secs = Some(parsed);
        }

        if let Some(v) = lookup("APP__DISPLAY_MODE") {
            self.display_mode = v
                .parse()
                .map_err(|err: String| anyhow!(err))
                .context("APP__DISPLAY_MODE")?;
        }

        Ok(())
    }

    pub fn set_base_url(&mut self, raw: &str) {
        self.base_url = normalize_base_url(raw);
    }

    /// Zero disables the timeout, same as leaving it unset.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    pub fn api_options(&self) -> ApiOptions {
        ApiOptions {
            base_url: self.base_url.clone(),
            request_timeout: self.request_timeout(),
        }
    }
}

fn normalize_base_url(raw: &str) -> String {
    let raw = raw.trim();

    if raw.is_empty() {
        return Settings::default().base_url;
    }

    if raw.contains("://") {
        return raw.to_string();
    }

    format!("http://{raw}")
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
