use std::{collections::HashMap, fs, path::Path, time::Duration};

use client_core::{ApiConfig, CredentialTransport, SessionStorageKind};
use tracing::{debug, warn};

pub const CONFIG_FILE: &str = "portal.toml";

/// Environment overrides, applied in order. Later entries win.
const ENV_KEYS: [(&str, &str); 7] = [
    ("PORTAL_API_URL", "api_url"),
    ("APP__API_URL", "api_url"),
    ("APP__PROFILE_PATH", "profile_path"),
    ("APP__CREDENTIAL_TRANSPORT", "credential_transport"),
    ("APP__SESSION_STORAGE", "session_storage"),
    ("APP__DATABASE_URL", "database_url"),
    ("APP__REQUEST_TIMEOUT_SECS", "request_timeout_secs"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub profile_path: String,
    pub credential_transport: CredentialTransport,
    pub session_storage: SessionStorageKind,
    pub database_url: String,
    pub request_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".into(),
            profile_path: client_core::transport::DEFAULT_PROFILE_PATH.into(),
            credential_transport: CredentialTransport::default(),
            session_storage: SessionStorageKind::default(),
            database_url: default_database_url(),
            request_timeout_secs: None,
        }
    }
}

impl Settings {
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.api_base_url.clone(),
            profile_path: self.profile_path.clone(),
            credential_transport: self.credential_transport,
            request_timeout: self.request_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Applies one `key = value` pair. Values that do not parse leave the
    /// current setting in place.
    fn apply(&mut self, key: &str, value: &str, source: &str) {
        let value = value.trim();
        match key {
            "api_url" => self.api_base_url = value.to_string(),
            "profile_path" => self.profile_path = value.to_string(),
            "database_url" => self.database_url = value.to_string(),
            "credential_transport" => match value.parse() {
                Ok(parsed) => self.credential_transport = parsed,
                Err(error) => warn!(%source, %error, "ignoring credential transport"),
            },
            "session_storage" => match value.parse() {
                Ok(parsed) => self.session_storage = parsed,
                Err(error) => warn!(%source, %error, "ignoring session storage"),
            },
            "request_timeout_secs" => match value.parse::<u64>() {
                Ok(0) => self.request_timeout_secs = None,
                Ok(secs) => self.request_timeout_secs = Some(secs),
                Err(error) => warn!(%source, %error, "ignoring request timeout"),
            },
            _ => debug!(%source, key, "unknown config key"),
        }
    }
}

pub fn load_settings() -> Settings {
    load_settings_from(Path::new(CONFIG_FILE), |name| std::env::var(name).ok())
}

pub fn load_settings_from(path: &Path, env: impl Fn(&str) -> Option<String>) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<HashMap<String, toml::Value>>(&raw) {
            Ok(file_cfg) => {
                let source = path.display().to_string();
                for (key, value) in &file_cfg {
                    match scalar_text(value) {
                        Some(text) => settings.apply(key, &text, &source),
                        None => warn!(%source, key, "ignoring non-scalar config value"),
                    }
                }
            }
            Err(error) => warn!(path = %path.display(), %error, "ignoring malformed config file"),
        }
    }

    for (name, key) in ENV_KEYS {
        if let Some(value) = env(name) {
            settings.apply(key, &value, name);
        }
    }

    settings
}

fn scalar_text(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(text) => Some(text.clone()),
        toml::Value::Integer(number) => Some(number.to_string()),
        toml::Value::Float(number) => Some(number.to_string()),
        toml::Value::Boolean(flag) => Some(flag.to_string()),
        _ => None,
    }
}

fn default_database_url() -> String {
    match dirs::data_dir() {
        Some(base) => base
            .join("estate-portal")
            .join("session.db")
            .display()
            .to_string(),
        None => "./data/session.db".into(),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
