//! Best-effort JSON repair
//!
//! Polling bodies are mostly JSON with a few recurring kinds of damage:
//! truncated final frames, unbalanced closers left over from frame joining,
//! and stray unescaped quotes inside strings. The lenient repair parses
//! whatever it can into a value tree and re-serializes it.

use crate::error::DecodeError;
use serde_json::{Map, Number, Value};

/// Pluggable text-to-text JSON repair
pub trait JsonRepair: Send + Sync {
    fn repair(&self, text: &str) -> Result<String, DecodeError>;
}

/// Pass-through repair, for bodies known to be valid JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRepair;

impl JsonRepair for NoRepair {
    fn repair(&self, text: &str) -> Result<String, DecodeError> {
        Ok(text.to_string())
    }
}

/// Lenient single-pass repair
///
/// - unterminated strings and containers are closed at end of input
/// - closers with no matching opener are dropped
/// - a closer that skips over open containers closes them too
/// - a quote inside a string that is not followed by a delimiter is kept
///   as a literal character
/// - anything after the first complete top-level value is ignored
#[derive(Debug, Clone, Copy, Default)]
pub struct LenientRepair;

impl JsonRepair for LenientRepair {
    fn repair(&self, text: &str) -> Result<String, DecodeError> {
        let value = parse_lenient(text)?;
        serde_json::to_string(&value).map_err(|e| DecodeError::MalformedPayload(e.to_string()))
    }
}

enum Frame {
    Array(Vec<Value>),
    Object {
        map: Map<String, Value>,
        key: Option<String>,
    },
}

impl Frame {
    fn is_object(&self) -> bool {
        matches!(self, Frame::Object { .. })
    }

    fn into_value(self) -> Value {
        match self {
            Frame::Array(items) => Value::Array(items),
            Frame::Object { mut map, key } => {
                if let Some(k) = key {
                    map.insert(k, Value::Null);
                }
                Value::Object(map)
            }
        }
    }
}

/// Attach a finished value to the innermost open container. Returns the
/// value back when there is no container, i.e. it is the document root.
fn attach(stack: &mut [Frame], value: Value) -> Option<Value> {
    match stack.last_mut() {
        None => Some(value),
        Some(Frame::Array(items)) => {
            items.push(value);
            None
        }
        Some(Frame::Object { map, key }) => {
            match key.take() {
                Some(k) => {
                    map.insert(k, value);
                }
                None => {
                    *key = Some(match value {
                        Value::String(s) => s,
                        other => other.to_string(),
                    });
                }
            }
            None
        }
    }
}

fn parse_lenient(text: &str) -> Result<Value, DecodeError> {
    let chars: Vec<char> = text.chars().collect();
    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<Value> = None;
    let mut pos = 0;

    while pos < chars.len() && root.is_none() {
        match chars[pos] {
            c if c.is_whitespace() || c == ',' || c == ':' => pos += 1,
            '{' => {
                stack.push(Frame::Object {
                    map: Map::new(),
                    key: None,
                });
                pos += 1;
            }
            '[' => {
                stack.push(Frame::Array(Vec::new()));
                pos += 1;
            }
            closer @ ('}' | ']') => {
                pos += 1;
                let want_object = closer == '}';
                if !stack.iter().any(|f| f.is_object() == want_object) {
                    continue;
                }
                while let Some(frame) = stack.pop() {
                    let matched = frame.is_object() == want_object;
                    if let Some(done) = attach(&mut stack, frame.into_value()) {
                        root = Some(done);
                        break;
                    }
                    if matched {
                        break;
                    }
                }
            }
            '"' => {
                let (s, next) = read_string(&chars, pos);
                pos = next;
                root = attach(&mut stack, Value::String(s));
            }
            _ => {
                let (token, next) = read_bare(&chars, pos);
                pos = next;
                root = attach(&mut stack, bare_value(&token));
            }
        }
    }

    while let Some(frame) = stack.pop() {
        if let Some(done) = attach(&mut stack, frame.into_value()) {
            root = Some(done);
        }
    }

    root.ok_or_else(|| DecodeError::MalformedPayload("no JSON value found".to_string()))
}

fn is_delimiter(c: char) -> bool {
    matches!(c, ',' | ':' | '{' | '}' | '[' | ']' | '"') || c.is_whitespace()
}

/// A quote closes the string only when the next significant character
/// could legally follow a string
fn closes_string(chars: &[char], mut pos: usize) -> bool {
    while pos < chars.len() && chars[pos].is_whitespace() {
        pos += 1;
    }
    pos >= chars.len() || matches!(chars[pos], ',' | ':' | '}' | ']')
}

fn read_string(chars: &[char], start: usize) -> (String, usize) {
    let mut out = String::new();
    let mut pos = start + 1;

    while pos < chars.len() {
        match chars[pos] {
            '\\' => {
                let Some(&esc) = chars.get(pos + 1) else {
                    return (out, chars.len());
                };
                pos += 2;
                match esc {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    'b' => out.push('\u{8}'),
                    'f' => out.push('\u{c}'),
                    'u' => {
                        let (ch, next) = read_unicode_escape(chars, pos);
                        out.push(ch);
                        pos = next;
                    }
                    other => out.push(other),
                }
            }
            '"' => {
                if closes_string(chars, pos + 1) {
                    return (out, pos + 1);
                }
                out.push('"');
                pos += 1;
            }
            ch => {
                out.push(ch);
                pos += 1;
            }
        }
    }

    (out, chars.len())
}

fn read_hex4(chars: &[char], pos: usize) -> Option<u32> {
    let digits: String = chars.get(pos..pos + 4)?.iter().collect();
    u32::from_str_radix(&digits, 16).ok()
}

/// `pos` points just past `\u`
fn read_unicode_escape(chars: &[char], pos: usize) -> (char, usize) {
    let Some(code) = read_hex4(chars, pos) else {
        return ('\u{FFFD}', (pos + 4).min(chars.len()));
    };
    let next = pos + 4;

    if (0xD800..0xDC00).contains(&code)
        && chars.get(next) == Some(&'\\')
        && chars.get(next + 1) == Some(&'u')
    {
        if let Some(low) = read_hex4(chars, next + 2) {
            if (0xDC00..0xE000).contains(&low) {
                let combined = 0x10000 + ((code - 0xD800) << 10) + (low - 0xDC00);
                return (
                    char::from_u32(combined).unwrap_or('\u{FFFD}'),
                    next + 6,
                );
            }
        }
    }

    (char::from_u32(code).unwrap_or('\u{FFFD}'), next)
}

fn read_bare(chars: &[char], start: usize) -> (String, usize) {
    let mut pos = start;
    while pos < chars.len() && !is_delimiter(chars[pos]) {
        pos += 1;
    }
    (chars[start..pos].iter().collect(), pos)
}

fn bare_value(token: &str) -> Value {
    match token {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" => return Value::Null,
        _ => {}
    }
    if let Ok(n) = serde_json::from_str::<Number>(token) {
        return Value::Number(n);
    }
    // truncated numbers such as "1." still carry a usable value
    if let Some(n) = token.parse::<f64>().ok().and_then(Number::from_f64) {
        return Value::Number(n);
    }
    Value::String(token.to_string())
}
