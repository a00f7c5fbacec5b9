use anyhow::{Result, anyhow};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::fmt;

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub directory: Directory,
    pub http: Http,
    pub log: Log,
    pub session: Session,
    #[serde(default)]
    pub token: TokenSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    #[serde(alias = "LDAP")]
    Ldap,
    #[serde(alias = "LDAPS")]
    Ldaps,
    #[serde(alias = "START_TLS")]
    StartTls,
}

#[derive(Deserialize)]
pub struct Directory {
    #[serde(default = "default_protocol")]
    pub protocol: Protocol,
    #[serde(default = "default_ldap_host")]
    pub host: String,
    #[serde(default = "default_ldap_port")]
    pub port: u16,
    #[serde(default)]
    pub skip_verify: bool,
    #[serde(default = "default_bind_dn")]
    pub bind_dn: String,
    #[serde(default = "default_bind_password")]
    pub bind_password: String,
    #[serde(default = "default_base_dn")]
    pub base_dn: String,
    #[serde(default = "default_user_filter")]
    pub user_filter: String,
    #[serde(default = "default_group_filter")]
    pub group_filter: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl fmt::Debug for Directory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directory")
            .field("protocol", &self.protocol)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("skip_verify", &self.skip_verify)
            .field("bind_dn", &self.bind_dn)
            .field("bind_password", &"<redacted>")
            .field("base_dn", &self.base_dn)
            .field("user_filter", &self.user_filter)
            .field("group_filter", &self.group_filter)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
pub struct Http {
    pub address: String,
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
pub struct Session {
    pub backend: String, // "redis" or "memory"
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    #[serde(default)]
    pub key_prefix: String,
}

#[derive(Debug, Deserialize)]
pub struct TokenSettings {
    #[serde(default = "default_access_ttl_minutes")]
    pub access_ttl_minutes: u64,
    #[serde(default = "default_refresh_ttl_minutes")]
    pub refresh_ttl_minutes: u64,
    #[serde(default = "default_access_private_key")]
    pub access_private_key: String,
    #[serde(default = "default_access_public_key")]
    pub access_public_key: String,
    #[serde(default = "default_refresh_private_key")]
    pub refresh_private_key: String,
    #[serde(default = "default_refresh_public_key")]
    pub refresh_public_key: String,
}

impl Default for Directory {
    fn default() -> Self {
        Directory {
            protocol: default_protocol(),
            host: default_ldap_host(),
            port: default_ldap_port(),
            skip_verify: false,
            bind_dn: default_bind_dn(),
            bind_password: default_bind_password(),
            base_dn: default_base_dn(),
            user_filter: default_user_filter(),
            group_filter: default_group_filter(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for TokenSettings {
    fn default() -> Self {
        TokenSettings {
            access_ttl_minutes: default_access_ttl_minutes(),
            refresh_ttl_minutes: default_refresh_ttl_minutes(),
            access_private_key: default_access_private_key(),
            access_public_key: default_access_public_key(),
            refresh_private_key: default_refresh_private_key(),
            refresh_public_key: default_refresh_public_key(),
        }
    }
}

fn default_protocol() -> Protocol {
    Protocol::Ldap
}
fn default_ldap_host() -> String {
    "localhost".to_string()
}
fn default_ldap_port() -> u16 {
    389
}
fn default_bind_dn() -> String {
    "cn=readonly,dc=example,dc=com".to_string()
}
fn default_bind_password() -> String {
    "readonly".to_string()
}
fn default_base_dn() -> String {
    "dc=example,dc=com".to_string()
}
fn default_user_filter() -> String {
    "(&(objectClass=posixAccount)(uid=%s))".to_string()
}
fn default_group_filter() -> String {
    "(&(objectClass=groupOfNames)(member=%s))".to_string()
}
fn default_timeout_secs() -> u64 {
    10
}
fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}
fn default_access_ttl_minutes() -> u64 {
    15
}
fn default_refresh_ttl_minutes() -> u64 {
    60 * 24 * 7
}
fn default_access_private_key() -> String {
    "private/access.key".to_string()
}
fn default_access_public_key() -> String {
    "private/access.key.pub".to_string()
}
fn default_refresh_private_key() -> String {
    "private/refresh.key".to_string()
}
fn default_refresh_public_key() -> String {
    "private/refresh.key.pub".to_string()
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

/// Environment overrides use this prefix and `__` between section and key,
/// e.g. `DIRAUTH_DIRECTORY__HOST`.
pub const ENV_PREFIX: &str = "DIRAUTH";

/// Loads settings from `path` (or the build's default file) and lets the
/// environment override any key. An explicit `path` must exist.
pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let file = match path {
        Some(path) => File::with_name(path).required(true),
        None => File::with_name(SETTINGS_PATH).required(false),
    };

    let settings: Settings = Config::builder()
        .set_default("http.address", "0.0.0.0:8080")
        .map_err(|e| anyhow!(e))?
        .set_default("log.filter", "info")
        .map_err(|e| anyhow!(e))?
        .set_default("session.backend", "redis")
        .map_err(|e| anyhow!(e))?
        .add_source(file)
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
