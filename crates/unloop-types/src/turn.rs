//! Conversation turn types for Unloop.
//!
//! A session's dialogue is an ordered, append-only sequence of turns.
//! Turns are immutable once appended; the only whole-history mutation is
//! the full-session overwrite performed by the store's upsert.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// Who produced a turn in the dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
    System,
}

impl fmt::Display for TurnRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnRole::User => write!(f, "user"),
            TurnRole::Model => write!(f, "model"),
            TurnRole::System => write!(f, "system"),
        }
    }
}

impl FromStr for TurnRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(TurnRole::User),
            "model" => Ok(TurnRole::Model),
            "system" => Ok(TurnRole::System),
            other => Err(format!("invalid turn role: '{other}'")),
        }
    }
}

/// A single turn within a session's dialogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: Uuid,
    pub role: TurnRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    /// Create a turn timestamped now with a fresh v7 id.
    pub fn new(role: TurnRole, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_role_roundtrip() {
        for role in [TurnRole::User, TurnRole::Model, TurnRole::System] {
            let s = role.to_string();
            let parsed: TurnRole = s.parse().unwrap();
            assert_eq!(role, parsed);
        }
    }

    #[test]
    fn test_turn_role_serde() {
        let role = TurnRole::Model;
        let json = serde_json::to_string(&role).unwrap();
        assert_eq!(json, "\"model\"");
        let parsed: TurnRole = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, TurnRole::Model);
    }

    #[test]
    fn test_turn_role_invalid() {
        assert!("assistant".parse::<TurnRole>().is_err());
    }

    #[test]
    fn test_conversation_turn_new() {
        let turn = ConversationTurn::new(TurnRole::User, "I feel stuck at work");
        assert_eq!(turn.role, TurnRole::User);
        assert_eq!(turn.content, "I feel stuck at work");
    }

    #[test]
    fn test_conversation_turn_serialize() {
        let turn = ConversationTurn::new(TurnRole::System, "crisis notice");
        let json = serde_json::to_string(&turn).unwrap();
        assert!(json.contains("\"role\":\"system\""));
    }
}
