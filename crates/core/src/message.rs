// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed message parts exchanged between clients and node/configuration
//! instances. A logical message is an ordered list of parts; each part is
//! null, raw bytes, a UTF-8 string, or a JSON value.

use serde_json::Value;

/// One component of a client message.
#[derive(Debug, Clone, PartialEq)]
pub enum MessagePart {
    Null,
    Binary(Vec<u8>),
    Text(String),
    Json(Value),
}

/// An ordered list of message parts.
pub type Message = Vec<MessagePart>;

impl MessagePart {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessagePart::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            MessagePart::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            MessagePart::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, MessagePart::Null)
    }
}

impl From<Value> for MessagePart {
    fn from(v: Value) -> Self {
        MessagePart::Json(v)
    }
}

impl From<&str> for MessagePart {
    fn from(s: &str) -> Self {
        MessagePart::Text(s.to_string())
    }
}

impl From<String> for MessagePart {
    fn from(s: String) -> Self {
        MessagePart::Text(s)
    }
}

impl From<Vec<u8>> for MessagePart {
    fn from(b: Vec<u8>) -> Self {
        MessagePart::Binary(b)
    }
}
