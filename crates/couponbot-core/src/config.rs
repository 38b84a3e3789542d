use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, warn};

use crate::caption::{DEFAULT_FOOTER_LINK, DEFAULT_FOOTER_TEXT};
use crate::error::{CouponError, Result};
use crate::types::Schedule;

pub const DEFAULT_PORT: u16 = 10000;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_GRAPH_URL: &str = "https://graph.facebook.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONFIG_FILE: &str = "couponbot.toml";

/// Deployment env vars that override the TOML file (names are fixed by the
/// hosting platform, so they carry no `COUPONBOT_` prefix).
pub const ENV_PORT: &str = "PORT";
pub const ENV_PAGE_ID: &str = "FACEBOOK_PAGE_ID";
pub const ENV_PAGE_ACCESS_TOKEN: &str = "FACEBOOK_PAGE_ACCESS_TOKEN";

/// Top-level config (couponbot.toml + COUPONBOT_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CouponConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub cursor: CursorConfig,
    #[serde(default)]
    pub facebook: FacebookConfig,
    #[serde(default)]
    pub caption: CaptionConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
        }
    }
}

/// Where the coupon table lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_path")]
    pub path: String,
    /// Worksheet name; the first sheet is used when unset.
    #[serde(default)]
    pub sheet: Option<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: default_source_path(),
            sheet: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CursorConfig {
    #[serde(default = "default_cursor_path")]
    pub path: String,
}

impl Default for CursorConfig {
    fn default() -> Self {
        Self {
            path: default_cursor_path(),
        }
    }
}

/// Graph API target and credentials.
///
/// `page_id` and `access_token` are normally injected through
/// `FACEBOOK_PAGE_ID` / `FACEBOOK_PAGE_ACCESS_TOKEN` and never written to disk.
#[derive(Clone, Serialize, Deserialize)]
pub struct FacebookConfig {
    #[serde(default, deserialize_with = "string_or_number")]
    pub page_id: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default = "default_graph_url")]
    pub graph_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FacebookConfig {
    fn default() -> Self {
        Self {
            page_id: None,
            access_token: None,
            graph_url: default_graph_url(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

// Hand-written so the token never lands in logs via `{:?}`.
impl std::fmt::Debug for FacebookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FacebookConfig")
            .field("page_id", &self.page_id)
            .field("access_token", &self.access_token.as_ref().map(|_| "[redacted]"))
            .field("graph_url", &self.graph_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionConfig {
    #[serde(default = "default_footer_text")]
    pub footer_text: String,
    #[serde(default = "default_footer_link")]
    pub footer_link: String,
}

impl Default for CaptionConfig {
    fn default() -> Self {
        Self {
            footer_text: default_footer_text(),
            footer_link: default_footer_link(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub schedule: Schedule,
    /// Fire the first cycle as soon as the process starts.
    #[serde(default)]
    pub run_on_start: bool,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_source_path() -> String {
    "coupons.xlsx".to_string()
}
fn default_cursor_path() -> String {
    "state.json".to_string()
}
fn default_graph_url() -> String {
    DEFAULT_GRAPH_URL.to_string()
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_footer_text() -> String {
    DEFAULT_FOOTER_TEXT.to_string()
}
fn default_footer_link() -> String {
    DEFAULT_FOOTER_LINK.to_string()
}

impl CouponConfig {
    /// Load config from a TOML file, `COUPONBOT_*` env vars, then the
    /// deployment env vars (`PORT`, `FACEBOOK_PAGE_ID`,
    /// `FACEBOOK_PAGE_ACCESS_TOKEN`).
    ///
    /// Path lookup: explicit argument, then `COUPONBOT_CONFIG`, then
    /// `./couponbot.toml`. A missing file is not an error.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path
            .map(String::from)
            .or_else(|| std::env::var("COUPONBOT_CONFIG").ok())
            .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());
        debug!(%path, "loading configuration");

        let mut config: CouponConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("COUPONBOT_").ignore(&["CONFIG"]).split("__"))
            .extract()
            .map_err(|e| CouponError::Config(e.to_string()))?;

        config.apply_env(|name| std::env::var(name).ok());
        config.scheduler.schedule.validate()?;
        Ok(config)
    }

    /// Apply the deployment env vars through `lookup` so tests need not touch
    /// the process environment.
    ///
    /// Each variable is applied on its own: an unusable `PORT` is logged and
    /// the configured port kept, and never stops the credentials from loading.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(ENV_PORT) {
            match port.trim().parse::<u16>() {
                Ok(p) => self.gateway.port = p,
                Err(_) => warn!(
                    value = %port,
                    port = self.gateway.port,
                    "{ENV_PORT} is not a valid port, keeping configured port"
                ),
            }
        }
        if let Some(id) = lookup(ENV_PAGE_ID).filter(|v| !v.trim().is_empty()) {
            self.facebook.page_id = Some(id.trim().to_string());
        }
        if let Some(token) = lookup(ENV_PAGE_ACCESS_TOKEN).filter(|v| !v.trim().is_empty()) {
            self.facebook.access_token = Some(token.trim().to_string());
        }
    }
}

/// Accept a page id written as a string or as a bare number.
///
/// Figment reads `COUPONBOT_FACEBOOK__PAGE_ID=1234` (and an unquoted TOML
/// value) as an integer.
fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Signed(i64),
        Unsigned(u64),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(s) => s,
        Raw::Signed(n) => n.to_string(),
        Raw::Unsigned(n) => n.to_string(),
    }))
}
