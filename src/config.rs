//! Configuration
//!
//! Loaded from an optional TOML file, overridden by `ACES__SECTION__KEY`
//! environment variables.

use crate::error::Result;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    pub telegram: Option<TelegramConfig>,
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("ACES")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

/// Long-polling endpoint settings
#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    #[serde(default = "default_site_url")]
    pub site_url: String,
    /// Page fetched first to obtain session cookies
    #[serde(default = "default_landing_path")]
    pub landing_path: String,
    #[serde(default = "default_socket_url")]
    pub socket_url: String,
    #[serde(default = "default_socket_path")]
    pub socket_path: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_client_version")]
    pub client_version: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_accept_language")]
    pub accept_language: String,
    /// One proxy per line, `host:port:user:pass` or a full URL
    #[serde(default)]
    pub proxy_file: Option<PathBuf>,
}

fn default_site_url() -> String {
    "https://www.winamax.fr".to_string()
}
fn default_landing_path() -> String {
    "/paris-sportifs/sports/5".to_string()
}
fn default_socket_url() -> String {
    "https://sports-eu-west-3.winamax.fr".to_string()
}
fn default_socket_path() -> String {
    "/uof-sports-server/socket.io/".to_string()
}
fn default_language() -> String {
    "FR".to_string()
}
fn default_client_version() -> String {
    "3.15.1".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/137.0.0.0 Safari/537.36".to_string()
}
fn default_accept_language() -> String {
    "fr-FR,fr;q=0.9".to_string()
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            site_url: default_site_url(),
            landing_path: default_landing_path(),
            socket_url: default_socket_url(),
            socket_path: default_socket_path(),
            language: default_language(),
            client_version: default_client_version(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            accept_language: default_accept_language(),
            proxy_file: None,
        }
    }
}

/// What to watch and how often
#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_sport_route")]
    pub sport_route: String,
    /// Filter tag identifying the match category of interest
    #[serde(default = "default_target_filter_tag")]
    pub target_filter_tag: i64,
    /// Case-insensitive substring a bet name must contain
    #[serde(default = "default_bet_name_keyword")]
    pub bet_name_keyword: String,
    #[serde(default = "default_match_link_base")]
    pub match_link_base: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    #[serde(default = "default_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
}

fn default_sport_route() -> String {
    "sport:5".to_string()
}
fn default_target_filter_tag() -> i64 {
    548
}
fn default_bet_name_keyword() -> String {
    "nombre d'aces".to_string()
}
fn default_match_link_base() -> String {
    "https://www.winamax.fr/paris-sportifs/match".to_string()
}
fn default_poll_interval_secs() -> u64 {
    15
}
fn default_retry_delay_secs() -> u64 {
    10
}
fn default_max_consecutive_failures() -> u32 {
    3
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            sport_route: default_sport_route(),
            target_filter_tag: default_target_filter_tag(),
            bet_name_keyword: default_bet_name_keyword(),
            match_link_base: default_match_link_base(),
            poll_interval_secs: default_poll_interval_secs(),
            retry_delay_secs: default_retry_delay_secs(),
            max_consecutive_failures: default_max_consecutive_failures(),
        }
    }
}

/// Durable state locations
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: PathBuf,
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,
    #[serde(default = "default_ledger_retention_days")]
    pub ledger_retention_days: i64,
    /// Raw response bodies are written here when set
    #[serde(default)]
    pub dump_dir: Option<PathBuf>,
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("aces_snapshot.json")
}
fn default_ledger_path() -> PathBuf {
    PathBuf::from("sent_notifications.txt")
}
fn default_ledger_retention_days() -> i64 {
    7
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot_path: default_snapshot_path(),
            ledger_path: default_ledger_path(),
            ledger_retention_days: default_ledger_retention_days(),
            dump_dir: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    /// Channel receiving new-market alerts
    pub alerts_chat_id: String,
    /// Channel receiving operational log lines
    #[serde(default)]
    pub log_chat_id: Option<String>,
}
