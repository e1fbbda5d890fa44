//! Chat sessions and the in-process session registry

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::ChatTurn;

/// One conversation and its ordered history
#[derive(Debug, Clone, Serialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub turns: Vec<ChatTurn>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            turns: Vec::new(),
        }
    }

    pub fn push(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    /// Drop every turn, keeping the session itself
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Sessions keyed by id
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<Uuid, ChatSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an empty session and return its id
    pub fn create(&self) -> Uuid {
        let session = ChatSession::new();
        let id = session.id;
        self.sessions.insert(id, session);
        tracing::debug!(session = %id, "Session created");
        id
    }

    pub fn get(&self, id: Uuid) -> Result<ChatSession> {
        self.sessions
            .get(&id)
            .map(|s| s.value().clone())
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }

    /// Append turns in order; returns the new history length
    pub fn append(&self, id: Uuid, turns: impl IntoIterator<Item = ChatTurn>) -> Result<usize> {
        let mut session = self
            .sessions
            .get_mut(&id)
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;
        for turn in turns {
            session.push(turn);
        }
        Ok(session.len())
    }

    pub fn clear(&self, id: Uuid) -> Result<()> {
        let mut session = self
            .sessions
            .get_mut(&id)
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;
        session.clear();
        Ok(())
    }

    pub fn delete(&self, id: Uuid) -> Result<()> {
        self.sessions
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::SessionNotFound(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
