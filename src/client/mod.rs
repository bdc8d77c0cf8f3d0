//! Transport collaborator for the sportsbook's long-polling socket
//!
//! The cycle pipeline only sees [`Transport`]: open a session, then fetch
//! poll bodies or post subscriptions against it.

mod proxy;
mod socket;

pub use proxy::{proxy_short_name, ProxyPool};
pub use socket::SocketClient;

use crate::decoder::encode_message_frame;
use crate::error::Result;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;

/// Engine.io session identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One request against an open session
#[derive(Debug, Clone, PartialEq)]
pub enum RequestSpec {
    /// GET the next batch of frames
    Poll,
    /// POST a route subscription message
    Subscribe {
        route: String,
        request_id: Option<String>,
        data: bool,
        menu: bool,
        client_time: Option<i64>,
    },
}

impl RequestSpec {
    /// Bare subscription, used to announce a route
    pub fn announce(route: &str, request_id: &str) -> Self {
        RequestSpec::Subscribe {
            route: route.to_string(),
            request_id: Some(request_id.to_string()),
            data: false,
            menu: false,
            client_time: None,
        }
    }

    /// Subscription asking for the route's data and menu
    pub fn subscribe_data(route: &str, request_id: Option<&str>, client_time: i64) -> Self {
        RequestSpec::Subscribe {
            route: route.to_string(),
            request_id: request_id.map(str::to_string),
            data: true,
            menu: true,
            client_time: Some(client_time),
        }
    }

    /// Message payload of a subscription, `None` for polls
    pub fn payload(&self) -> Option<Value> {
        let RequestSpec::Subscribe {
            route,
            request_id,
            data,
            menu,
            client_time,
        } = self
        else {
            return None;
        };

        let mut payload = Map::new();
        payload.insert("route".to_string(), Value::from(route.as_str()));
        if let Some(id) = request_id {
            payload.insert("requestId".to_string(), Value::from(id.as_str()));
        }
        if *data {
            payload.insert("data".to_string(), Value::Bool(true));
        }
        if *menu {
            payload.insert("menu".to_string(), Value::Bool(true));
        }
        if let Some(t) = client_time {
            payload.insert("clientTime".to_string(), Value::from(*t));
        }
        Some(Value::Object(payload))
    }

    /// Length-prefixed frame to POST, `None` for polls
    pub fn frame(&self) -> Option<String> {
        self.payload().map(|p| encode_message_frame(&p))
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish a session and return its id
    async fn open_session(&self) -> Result<SessionId>;

    /// Raw response body for one request
    async fn fetch(&self, session: &SessionId, request: &RequestSpec) -> Result<Vec<u8>>;
}

/// Subscription acknowledgements carry one of these markers
pub fn is_subscription_ack(body: &[u8]) -> bool {
    let text = String::from_utf8_lossy(body);
    text.contains("ok") || text.contains("matches")
}
