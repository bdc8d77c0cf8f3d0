//! Telegram notifications
//!
//! New-market alerts go to the alerts chat; short operational lines go to
//! the optional log chat. A notifier without credentials rejects alerts
//! and drops log lines.


use crate::config::TelegramConfig;
use crate::diff::AlertSink;
use crate::error::{Result, WatchError};
use async_trait::async_trait;
use chrono::Local;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::warn;

const TELEGRAM_API: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
    disable_web_page_preview: bool,
}

#[derive(Clone)]
pub struct Notifier {
    http: Client,
    bot_token: String,
    alerts_chat_id: String,
    log_chat_id: Option<String>,
    enabled: bool,
}

impl Notifier {
    pub fn new(bot_token: String, alerts_chat_id: String) -> Self {
        Self {
            http: Self::http_client(),
            bot_token,
            alerts_chat_id,
            log_chat_id: None,
            enabled: true,
        }
    }

    pub fn disabled() -> Self {
        Self {
            http: Self::http_client(),
            bot_token: String::new(),
            alerts_chat_id: String::new(),
            log_chat_id: None,
            enabled: false,
        }
    }

    pub fn from_config(config: Option<&TelegramConfig>) -> Self {
        match config {
            Some(tg) => Self::new(tg.bot_token.clone(), tg.alerts_chat_id.clone())
                .with_log_chat(tg.log_chat_id.clone()),
            None => Self::disabled(),
        }
    }

    pub fn with_log_chat(mut self, log_chat_id: Option<String>) -> Self {
        self.log_chat_id = log_chat_id.filter(|id| !id.is_empty());
        self
    }

    fn http_client() -> Client {
        Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| Client::new())
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Send HTML text to the alerts chat
    pub async fn send(&self, text: &str) -> Result<()> {
        if !self.enabled {
            return Err(WatchError::Notify("telegram not configured".to_string()));
        }
        self.send_to(&self.alerts_chat_id, text).await
    }

    /// Send a timestamped line to the log chat, if configured
    ///
    /// Failures are logged and never returned.
    pub async fn log_event(&self, text: &str) {
        if !self.enabled {
            return;
        }
        let Some(chat_id) = self.log_chat_id.as_deref() else {
            return;
        };
        let line = log_line(text, &Local::now().format("%H:%M:%S").to_string());
        if let Err(e) = self.send_to(chat_id, &line).await {
            warn!("Failed to send log event: {}", e);
        }
    }

    async fn send_to(&self, chat_id: &str, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", TELEGRAM_API, self.bot_token);
        let request = SendMessageRequest {
            chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };

        let resp = self.http.post(&url).json(&request).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(WatchError::Notify(format!("telegram error {}: {}", status, body)));
        }
        Ok(())
    }
}

#[async_trait]
impl AlertSink for Notifier {
    async fn send_alert(&self, text: &str) -> Result<()> {
        self.send(text).await
    }
}

/// `🔔 [HH:MM:SS] text`
pub fn log_line(text: &str, clock: &str) -> String {
    format!("🔔 [{}] {}", clock, text)
}

pub fn cycle_started(cycle: u64, proxy_name: &str) -> String {
    format!("🔄 Cycle #{} démarré [{}]", cycle, proxy_name)
}

pub fn matches_found(candidates: usize) -> String {
    format!("🎾 {} match(s) avec aces trouvé(s)", candidates)
}

pub fn cycle_summary(matches: usize, bets: usize, proxy_name: &str) -> String {
    format!("✅ OK - {} matchs, {} paris [{}]", matches, bets, proxy_name)
}
