//! Engine.io v3 long-polling client over reqwest

use super::{is_subscription_ack, proxy_short_name, RequestSpec, SessionId, Transport};
use crate::config::TransportConfig;
use crate::decoder::extract_session_id;
use crate::error::{Result, TransportError, WatchError};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8";

/// Cookie-keeping client bound to one optional proxy
#[derive(Clone)]
pub struct SocketClient {
    http: Client,
    landing_url: String,
    endpoint: String,
    language: String,
    client_version: String,
    proxy_name: String,
}

impl SocketClient {
    pub fn new(config: &TransportConfig, proxy: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_HTML));
        headers.insert(
            ACCEPT_LANGUAGE,
            HeaderValue::from_str(&config.accept_language).map_err(|e| {
                TransportError::Rejected(format!("invalid accept-language header: {}", e))
            })?,
        );

        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .cookie_store(true)
            .user_agent(config.user_agent.as_str())
            .default_headers(headers);

        if let Some(url) = proxy {
            let proxy = reqwest::Proxy::all(url)
                .map_err(|e| TransportError::InvalidProxy(format!("{}: {}", proxy_short_name(Some(url)), e)))?;
            builder = builder.proxy(proxy);
        }

        Ok(Self {
            http: builder.build()?,
            landing_url: format!(
                "{}{}",
                config.site_url.trim_end_matches('/'),
                config.landing_path
            ),
            endpoint: format!(
                "{}{}",
                config.socket_url.trim_end_matches('/'),
                config.socket_path
            ),
            language: config.language.clone(),
            client_version: config.client_version.clone(),
            proxy_name: proxy_short_name(proxy),
        })
    }

    /// Display name of the proxy in use
    pub fn proxy_name(&self) -> &str {
        &self.proxy_name
    }

    fn query(&self, session: Option<&SessionId>) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("language", self.language.clone()),
            ("version", self.client_version.clone()),
            ("embed", "false".to_string()),
            ("EIO", "3".to_string()),
            ("transport", "polling".to_string()),
            ("t", Utc::now().timestamp_millis().to_string()),
        ];
        if let Some(sid) = session {
            query.push(("sid", sid.as_str().to_string()));
        }
        query
    }

    /// Landing page GET, which seeds the session cookies
    pub async fn fetch_landing(&self) -> Result<()> {
        let resp = self.http.get(&self.landing_url).send().await?;
        let status = resp.status();
        debug!("Landing page status {} [{}]", status, self.proxy_name);
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_default();
            return Err(status_error(status, body));
        }
        Ok(())
    }

    pub async fn handshake(&self) -> Result<SessionId> {
        let body = self.get(None).await?;
        let sid = extract_session_id(&body)?;
        debug!("Session id {}", sid);
        Ok(SessionId(sid))
    }

    async fn get(&self, session: Option<&SessionId>) -> Result<Vec<u8>> {
        let resp = self
            .http
            .get(&self.endpoint)
            .query(&self.query(session))
            .send()
            .await?;
        read_body(resp).await
    }

    async fn post(&self, session: &SessionId, frame: String) -> Result<Vec<u8>> {
        let resp = self
            .http
            .post(&self.endpoint)
            .query(&self.query(Some(session)))
            .header(CONTENT_TYPE, "text/plain;charset=UTF-8")
            .body(frame)
            .send()
            .await?;
        read_body(resp).await
    }
}

async fn read_body(resp: reqwest::Response) -> Result<Vec<u8>> {
    let status = resp.status();
    let body = resp.bytes().await?;
    if !status.is_success() {
        return Err(status_error(status, String::from_utf8_lossy(&body).into_owned()));
    }
    Ok(body.to_vec())
}

fn status_error(status: StatusCode, body: String) -> WatchError {
    TransportError::Status {
        status: status.as_u16(),
        body: body.chars().take(200).collect(),
    }
    .into()
}

#[async_trait]
impl Transport for SocketClient {
    async fn open_session(&self) -> Result<SessionId> {
        self.fetch_landing().await?;
        let sid = self.handshake().await?;
        // the first poll only carries the open/connect packets
        let opening = self.get(Some(&sid)).await?;
        debug!("Opening poll of {} bytes discarded", opening.len());
        Ok(sid)
    }

    async fn fetch(&self, session: &SessionId, request: &RequestSpec) -> Result<Vec<u8>> {
        let Some(frame) = request.frame() else {
            return self.get(Some(session)).await;
        };

        debug!("POST {}", frame);
        let ack = self.post(session, frame).await?;
        if !is_subscription_ack(&ack) {
            return Err(TransportError::Rejected(format!(
                "subscription not acknowledged: {}",
                String::from_utf8_lossy(&ack).chars().take(200).collect::<String>()
            ))
            .into());
        }
        Ok(ack)
    }
}
