//! Protocol session store
//!
//! Conversation state of the generation assistant: one session per protocol
//! exchange with its message log.

use serde::{Deserialize, Serialize};

use crate::core::{
    codec, Collection, Holds, Patch, PersistentStore, Record, StoreError, StoreState,
};

/// Author of a session message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMessage {
    pub role: Role,
    pub content: String,
}

impl SessionMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Whether a session still accepts messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Open,
    Closed,
}

/// A protocol session and its message log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolSession {
    pub id: String,
    pub protocol: String,
    #[serde(default)]
    pub status: SessionStatus,
    #[serde(default)]
    pub messages: Vec<SessionMessage>,
}

impl ProtocolSession {
    /// A new open session with no messages
    pub fn open(id: impl Into<String>, protocol: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            protocol: protocol.into(),
            status: SessionStatus::Open,
            messages: Vec::new(),
        }
    }
}

impl Record for ProtocolSession {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Partial update for a [`ProtocolSession`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionPatch {
    pub protocol: Option<String>,
    pub status: Option<SessionStatus>,
    pub messages: Option<Vec<SessionMessage>>,
}

impl Patch<ProtocolSession> for SessionPatch {
    fn apply(self, record: &mut ProtocolSession) -> Result<(), StoreError> {
        if let Some(protocol) = self.protocol {
            record.protocol = protocol;
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(messages) = self.messages {
            record.messages = messages;
        }
        Ok(())
    }
}

/// Appends one message to an open session; closed sessions are left as is
struct AppendMessage(SessionMessage);

impl Patch<ProtocolSession> for AppendMessage {
    fn apply(self, record: &mut ProtocolSession) -> Result<(), StoreError> {
        if record.status == SessionStatus::Open {
            record.messages.push(self.0);
        }
        Ok(())
    }
}

/// State of the protocol session store
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    #[serde(with = "codec::pairs")]
    pub sessions: Collection<ProtocolSession>,
    pub active_session: Option<String>,
}

impl StoreState for SessionState {}

impl Holds<ProtocolSession> for SessionState {
    fn collection(&self) -> &Collection<ProtocolSession> {
        &self.sessions
    }

    fn collection_mut(&mut self) -> &mut Collection<ProtocolSession> {
        &mut self.sessions
    }

    fn selected(&self) -> Option<&str> {
        self.active_session.as_deref()
    }

    fn select(&mut self, key: Option<String>) -> bool {
        self.active_session = key;
        true
    }
}

/// Store of protocol sessions
pub type SessionStore = PersistentStore<SessionState>;

impl PersistentStore<SessionState> {
    /// Append a message to a session
    ///
    /// Returns false if the session does not exist; messages sent to a
    /// closed session are dropped.
    pub fn append_message(&mut self, session_id: &str, message: SessionMessage) -> bool {
        self.update::<ProtocolSession, _>(session_id, AppendMessage(message))
    }

    /// Close a session so it accepts no further messages
    pub fn close_session(&mut self, session_id: &str) -> bool {
        self.update::<ProtocolSession, _>(
            session_id,
            SessionPatch {
                status: Some(SessionStatus::Closed),
                ..Default::default()
            },
        )
    }

    /// The active session, if it still exists
    pub fn active(&self) -> Option<&ProtocolSession> {
        self.current::<ProtocolSession>()
    }
}
