//! Protocol document model.
//!
//! # Responsibilities
//! - Parse one inbound frame into an [`Event`]
//! - Classify documents (API response vs. the event categories)
//! - Expose typed accessors over the underlying JSON
//!
//! # Design Decisions
//! - The raw document is kept intact; handlers may need fields the core
//!   does not model
//! - Router annotations (`to_me`, `command_len`) live on the wrapper, not
//!   in the document — they are not protocol fields

use serde_json::Value;

use crate::permission::{GroupRole, SenderInfo};

/// Top-level classification of an inbound document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Response to a previously sent API request, carrying an echo id.
    ApiResponse,
    Message,
    Notice,
    Request,
    Meta,
    /// Document with no recognizable discriminant. Dropped by the router.
    Unknown,
}

/// One parsed protocol document plus router-computed annotations.
#[derive(Debug, Clone)]
pub struct Event {
    doc: Value,
    /// Set when a leading mention named the bot itself.
    pub to_me: bool,
    /// Matched command length in characters. Zero for exact matches,
    /// negative magnitude for suffix matches.
    pub command_len: i32,
}

impl Event {
    /// Parse a frame into an event. Malformed JSON is a recoverable error;
    /// the caller drops the frame.
    pub fn parse(frame: &str) -> Result<Self, serde_json::Error> {
        let doc: Value = serde_json::from_str(frame)?;
        Ok(Self {
            doc,
            to_me: false,
            command_len: 0,
        })
    }

    pub fn from_value(doc: Value) -> Self {
        Self {
            doc,
            to_me: false,
            command_len: 0,
        }
    }

    /// Classify the document. A `retcode` field marks an API response
    /// regardless of any other content; events are told apart by
    /// `post_type`.
    pub fn kind(&self) -> EventKind {
        if self.doc.get("retcode").is_some() {
            return EventKind::ApiResponse;
        }
        match self.str_field("post_type") {
            Some("message") => EventKind::Message,
            Some("notice") => EventKind::Notice,
            Some("request") => EventKind::Request,
            Some("meta_event") => EventKind::Meta,
            _ => EventKind::Unknown,
        }
    }

    pub fn raw(&self) -> &Value {
        &self.doc
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.doc.get(key).and_then(Value::as_str)
    }

    fn int_field(&self, key: &str) -> Option<i64> {
        self.doc.get(key).and_then(Value::as_i64)
    }

    pub fn self_id(&self) -> Option<i64> {
        self.int_field("self_id")
    }

    pub fn user_id(&self) -> Option<i64> {
        self.int_field("user_id")
    }

    pub fn group_id(&self) -> Option<i64> {
        self.int_field("group_id")
    }

    pub fn message(&self) -> Option<&str> {
        self.str_field("message")
    }

    pub fn message_type(&self) -> Option<&str> {
        self.str_field("message_type")
    }

    pub fn sub_type(&self) -> Option<&str> {
        self.str_field("sub_type")
    }

    pub fn notice_type(&self) -> Option<&str> {
        self.str_field("notice_type")
    }

    pub fn request_type(&self) -> Option<&str> {
        self.str_field("request_type")
    }

    pub fn meta_event_type(&self) -> Option<&str> {
        self.str_field("meta_event_type")
    }

    /// Sender group role, when the platform reports one.
    pub fn sender_role(&self) -> Option<GroupRole> {
        let role = self.doc.get("sender")?.get("role")?.as_str()?;
        match role {
            "owner" => Some(GroupRole::Owner),
            "admin" => Some(GroupRole::Admin),
            "member" => Some(GroupRole::Member),
            _ => None,
        }
    }

    /// Sender identity used for permission resolution.
    pub fn sender(&self) -> Option<SenderInfo> {
        Some(SenderInfo {
            user_id: self.user_id()?,
            group_id: self.group_id(),
            role: self.sender_role(),
        })
    }

    /// Echo id of an API response document.
    pub fn echo(&self) -> Option<u64> {
        self.doc.get("echo").and_then(Value::as_u64)
    }

    /// Extract the response shape of an API-response document.
    pub fn api_response(&self) -> Option<ApiResponse> {
        let retcode = self.int_field("retcode")?;
        Some(ApiResponse {
            status: self.str_field("status").unwrap_or("failed").to_string(),
            retcode,
            data: self.doc.get("data").cloned().unwrap_or(Value::Null),
        })
    }

    /// Replace the message text in place. Used by the router after
    /// stripping a leading mention so handlers see the stripped text.
    pub(crate) fn set_message(&mut self, text: String) {
        if let Some(doc) = self.doc.as_object_mut() {
            doc.insert("message".to_string(), Value::String(text));
        }
    }
}

/// Parsed body of an API response, delivered to request completions.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: String,
    pub retcode: i64,
    pub data: Value,
}

impl ApiResponse {
    /// Whether the gateway reported success.
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
