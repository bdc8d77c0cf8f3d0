//! Frame decoder for the long-polling transport
//!
//! A polling body is a run of engine.io v3 frames, each `<len>:<packet>`,
//! where message packets wrap `["m", {...}]`. Frames are flattened into a
//! single array so the business payload sits at index 1, then the document
//! is searched for its largest `bets`/`outcomes`/`odds` block.

pub mod repair;

pub use repair::{JsonRepair, LenientRepair, NoRepair};

use crate::error::DecodeError;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::debug;

/// Keys of the market data triple
pub const DEFINITIONS_KEY: &str = "bets";
pub const OUTCOMES_KEY: &str = "outcomes";
pub const PRICES_KEY: &str = "odds";

/// End of one frame plus the length/type prefix of the next message frame
static FRAME_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\]?(?:\d+:)?\d*\["m","#).unwrap());

/// Handshake object, optionally behind a `<len>:<type>` prefix
static HANDSHAKE_OBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)(?:\d+:\d*)?(\{.*\})").unwrap());

#[derive(Debug, Deserialize)]
struct Handshake {
    sid: Option<String>,
}

/// Pull the session id out of a handshake response
pub fn extract_session_id(raw: &[u8]) -> Result<String, DecodeError> {
    let text = String::from_utf8_lossy(raw);
    let object = HANDSHAKE_OBJECT
        .captures(&text)
        .and_then(|c| c.get(1))
        .ok_or(DecodeError::NoSessionId)?;

    // the greedy match may run into later frames; only the first value counts
    let mut values = serde_json::Deserializer::from_str(object.as_str()).into_iter::<Handshake>();
    match values.next() {
        Some(Ok(Handshake { sid: Some(sid) })) if !sid.is_empty() => Ok(sid),
        _ => Err(DecodeError::NoSessionId),
    }
}

/// Encode one message packet (`42["m",payload]`) as a frame prefixed with its UTF-16 length
pub fn encode_message_frame(payload: &Value) -> String {
    let packet = format!(r#"42["m",{}]"#, payload);
    format!("{}:{}", packet.encode_utf16().count(), packet)
}

/// Flatten a polling body into one array whose element 1 is the payload
pub fn normalize_to_array(raw: &[u8], repair: &dyn JsonRepair) -> Result<Value, DecodeError> {
    let text = String::from_utf8_lossy(raw);
    let mut text = text.trim();

    if text.starts_with("//") {
        text = match text.find('\n') {
            Some(idx) => &text[idx + 1..],
            None => "",
        };
    }

    let joined = FRAME_BOUNDARY.replace_all(text, r#",["m","#);
    let start = joined
        .find('[')
        .ok_or_else(|| DecodeError::MalformedPayload("no array in body".to_string()))?;

    let mut body = joined[start..].trim().to_string();
    if !body.ends_with("]]") {
        body.push_str("]]");
    }

    let repaired = repair.repair(&body)?;
    let document: Value = serde_json::from_str(&repaired)
        .map_err(|e| DecodeError::MalformedPayload(e.to_string()))?;

    payload_root(&document)?;
    debug!("Normalized body of {} bytes", raw.len());
    Ok(document)
}

/// The business payload of a normalized document
pub fn payload_root(document: &Value) -> Result<&Map<String, Value>, DecodeError> {
    let items = document
        .as_array()
        .ok_or_else(|| DecodeError::UnexpectedShape("document is not an array".to_string()))?;

    if items.len() < 2 {
        return Err(DecodeError::UnexpectedShape(format!(
            "expected at least 2 elements, got {}",
            items.len()
        )));
    }

    items[1]
        .as_object()
        .ok_or_else(|| DecodeError::UnexpectedShape("element 1 is not an object".to_string()))
}

/// Market definitions, outcome labels and prices found side by side
#[derive(Debug, Clone, Copy)]
pub struct DensestBlock<'a> {
    pub definitions: &'a Map<String, Value>,
    pub outcomes: &'a Map<String, Value>,
    pub prices: &'a Map<String, Value>,
}

impl<'a> DensestBlock<'a> {
    fn from_object(object: &'a Map<String, Value>) -> Option<Self> {
        Some(Self {
            definitions: object.get(DEFINITIONS_KEY)?.as_object()?,
            outcomes: object.get(OUTCOMES_KEY)?.as_object()?,
            prices: object.get(PRICES_KEY)?.as_object()?,
        })
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

/// Find the block with the most market definitions anywhere in the document
///
/// Ties go to the first block in depth-first document order.
pub fn find_densest_block(document: &Value) -> Option<DensestBlock<'_>> {
    let mut best: Option<DensestBlock<'_>> = None;
    let mut pending: Vec<&Value> = vec![document];

    while let Some(node) = pending.pop() {
        match node {
            Value::Object(object) => {
                if let Some(block) = DensestBlock::from_object(object) {
                    if best.map_or(true, |b| block.len() > b.len()) {
                        best = Some(block);
                    }
                }
                pending.extend(object.values().rev());
            }
            Value::Array(items) => pending.extend(items.iter().rev()),
            _ => {}
        }
    }

    best
}

/// Decoder bundling the repair strategy with the frame rules
pub struct FrameDecoder {
    repair: Box<dyn JsonRepair>,
}

impl FrameDecoder {
    pub fn new(repair: Box<dyn JsonRepair>) -> Self {
        Self { repair }
    }

    pub fn session_id(&self, raw: &[u8]) -> Result<String, DecodeError> {
        extract_session_id(raw)
    }

    pub fn decode(&self, raw: &[u8]) -> Result<Value, DecodeError> {
        normalize_to_array(raw, self.repair.as_ref())
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new(Box::new(LenientRepair))
    }
}
