use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub database: DatabaseConfig,
    pub whatsapp: WhatsAppConfig,
    pub responder: ResponderConfig,
    pub relay: RelayConfig,
    pub aliases: AliasConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8091,
        }
    }
}

/// Shared secret the sidecar must present on webhook calls.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub sqlite_path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            sqlite_path: "~/.wa-relay/devices.sqlite".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WhatsAppConfig {
    pub account_id: String,
    pub sidecar_url: String,
    pub inbound_path: String,
    pub pairing_path: String,
    pub request_timeout_secs: u64,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            account_id: "default".to_string(),
            sidecar_url: "http://127.0.0.1:4040".to_string(),
            inbound_path: "/v1/channels/whatsapp/inbound".to_string(),
            pairing_path: "/v1/channels/whatsapp/pairing".to_string(),
            request_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponderConfig {
    pub url: String,
    pub timeout_secs: u64,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:5001/chat".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Concurrent responder round-trips. 1 keeps transport delivery order.
    pub max_in_flight: usize,
    pub queue_capacity: usize,
    pub send_timeout_secs: u64,
    pub drain_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 1,
            queue_capacity: 100,
            send_timeout_secs: 30,
            drain_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AliasConfig {
    pub path: String,
}

impl Default for AliasConfig {
    fn default() -> Self {
        Self {
            path: "numbers-to-names.json".to_string(),
        }
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

pub fn resolve_config_path() -> PathBuf {
    env::var("WA_RELAY_CONFIG")
        .ok()
        .map(PathBuf::from)
        .unwrap_or_else(|| expand_tilde("~/.wa-relay/wa-relay.json"))
}

pub fn load_config() -> Config {
    let config_path = resolve_config_path();
    let mut cfg = Config::default();

    if config_path.exists() {
        match fs::read_to_string(&config_path) {
            Ok(raw) => match serde_json::from_str::<Config>(&raw) {
                Ok(file_cfg) => cfg = file_cfg,
                Err(err) => {
                    warn!(path = %config_path.display(), error = %err, "invalid config file, using defaults")
                }
            },
            Err(err) => {
                warn!(path = %config_path.display(), error = %err, "unreadable config file, using defaults")
            }
        }
    }

    apply_env_overrides(&mut cfg);
    cfg
}

fn non_blank_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

pub fn apply_env_overrides(cfg: &mut Config) {
    if let Some(token) = non_blank_env("WA_RELAY_TOKEN") {
        cfg.auth.token = Some(token);
    }
    if let Some(url) = non_blank_env("WA_RELAY_DATABASE_URL") {
        cfg.database.url = Some(url);
    }
    if let Some(path) = non_blank_env("WA_RELAY_SQLITE_PATH") {
        cfg.database.sqlite_path = path;
    }
    if let Some(url) = non_blank_env("WA_RELAY_SIDECAR_URL") {
        cfg.whatsapp.sidecar_url = url;
    }
    if let Some(url) = non_blank_env("WA_RELAY_RESPONDER_URL") {
        cfg.responder.url = url;
    }
    if let Some(path) = non_blank_env("WA_RELAY_ALIASES") {
        cfg.aliases.path = path;
    }
}

pub fn resolve_alias_path(cfg: &Config) -> PathBuf {
    expand_tilde(&cfg.aliases.path)
}

pub fn resolve_database_url(cfg: &Config) -> String {
    if let Some(url) = cfg.database.url.as_ref() {
        return url.to_string();
    }

    let path = expand_tilde(&cfg.database.sqlite_path);
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    format!("sqlite://{}?mode=rwc", path.to_string_lossy())
}
