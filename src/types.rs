use serde::{Deserialize, Serialize};
use std::fmt;

/// Chat handle (group or one-to-one), used verbatim as the reply target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Part of the JID before the server, e.g. the group id of `123@g.us`.
    pub fn user(&self) -> &str {
        jid_user(&self.0)
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-account sender handle. One sender may appear in many conversations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SenderId(pub String);

impl SenderId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Account part of the sender JID, without server or device suffix.
    /// This is the key the alias table is written against.
    pub fn user(&self) -> &str {
        jid_user(&self.0)
    }
}

impl fmt::Display for SenderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn jid_user(jid: &str) -> &str {
    let user = jid.split_once('@').map(|(user, _)| user).unwrap_or(jid);
    user.split_once(':').map(|(user, _)| user).unwrap_or(user)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessagePayload {
    Text {
        #[serde(default)]
        text: String,
    },
    Image {
        #[serde(default)]
        caption: Option<String>,
    },
    Video {
        #[serde(default)]
        caption: Option<String>,
    },
    Audio,
    Document {
        #[serde(default)]
        caption: Option<String>,
    },
    ExtendedText {
        #[serde(default)]
        text: String,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessageEvent {
    #[serde(default = "new_event_id")]
    pub id: String,
    pub chat: ConversationId,
    pub sender: SenderId,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub timestamp: Option<i64>,
    pub payload: MessagePayload,
}

fn new_event_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Every event kind the sidecar transport can push at the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProtocolEvent {
    Message(InboundMessageEvent),
    Connected,
    Disconnected {
        #[serde(default)]
        reason: Option<String>,
    },
    LoggedOut {
        #[serde(default)]
        reason: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PairingEventPayload", into = "PairingEventPayload")]
pub enum PairingEvent {
    Code(String),
    Success { jid: Option<String> },
    Timeout,
    Other(String),
}

impl PairingEvent {
    pub fn name(&self) -> &str {
        match self {
            PairingEvent::Code(_) => "code",
            PairingEvent::Success { .. } => "success",
            PairingEvent::Timeout => "timeout",
            PairingEvent::Other(name) => name,
        }
    }

    /// Whether the login attempt is over once this event is seen.
    pub fn is_terminal(&self) -> bool {
        match self {
            PairingEvent::Code(_) => false,
            PairingEvent::Success { .. } | PairingEvent::Timeout => true,
            PairingEvent::Other(name) => name == "error" || name.starts_with("err-"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairingEventPayload {
    #[serde(rename = "type")]
    pub event: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jid: Option<String>,
}

impl From<PairingEventPayload> for PairingEvent {
    fn from(payload: PairingEventPayload) -> Self {
        match payload.event.as_str() {
            "code" => PairingEvent::Code(payload.code.unwrap_or_default()),
            "success" => PairingEvent::Success { jid: payload.jid },
            "timeout" => PairingEvent::Timeout,
            _ => PairingEvent::Other(payload.event),
        }
    }
}

impl From<PairingEvent> for PairingEventPayload {
    fn from(event: PairingEvent) -> Self {
        let name = event.name().to_string();
        match event {
            PairingEvent::Code(code) => Self {
                event: name,
                code: Some(code),
                jid: None,
            },
            PairingEvent::Success { jid } => Self {
                event: name,
                code: None,
                jid,
            },
            PairingEvent::Timeout | PairingEvent::Other(_) => Self {
                event: name,
                code: None,
                jid: None,
            },
        }
    }
}

/// Per-event request to the responder. Never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayRequest {
    pub text: String,
    pub chat: ConversationId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    NoReply,
}

impl Reply {
    /// Maps a raw responder body, treating `sentinel` as "suppress outbound message".
    pub fn from_body(body: String, sentinel: &str) -> Self {
        if body == sentinel {
            Reply::NoReply
        } else {
            Reply::Text(body)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundBody {
    pub text: String,
}

impl OutboundBody {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}
