//! Life snapshot types for Unloop.
//!
//! A `LifeSnapshot` is the structured summary the model produces from a
//! full session transcript. It is generated at most once per session and
//! treated as immutable afterwards -- regenerating replaces the whole
//! object, individual fields are never patched.
//!
//! All types derive `schemars::JsonSchema` so the structured-output schema
//! sent to the model is generated from the Rust definitions themselves.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// How often a surfaced behavior shows up in the user's account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Frequency {
    High,
    Medium,
    Low,
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frequency::High => write!(f, "High"),
            Frequency::Medium => write!(f, "Medium"),
            Frequency::Low => write!(f, "Low"),
        }
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high" => Ok(Frequency::High),
            "medium" => Ok(Frequency::Medium),
            "low" => Ok(Frequency::Low),
            other => Err(format!("invalid frequency: '{other}'")),
        }
    }
}

/// One recurring behavior surfaced from the conversation.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PatternEntry {
    /// The behavior in the user's own terms.
    pub behavior: String,
    /// How often it appears in their account.
    pub frequency: Frequency,
}

/// The user's energy picture on a 1-10 scale.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EnergyBalance {
    /// How much the current situation drains them (1-10).
    pub drains: u8,
    /// How much it gives back (1-10).
    pub gains: u8,
    /// A short narrative of the balance.
    pub description: String,
}

impl EnergyBalance {
    /// Clamp both scores into the 1-10 range the model is asked for.
    ///
    /// Applied after decoding -- the schema states the range but a decoded
    /// payload is not trusted to honor it.
    pub fn clamped(mut self) -> Self {
        self.drains = self.drains.clamp(1, 10);
        self.gains = self.gains.clamp(1, 10);
        self
    }
}

/// Structured summary of a reflection session.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LifeSnapshot {
    /// The dominant theme of the conversation.
    pub primary_theme: String,
    /// The single constraint currently holding the user back.
    pub the_bottleneck: String,
    /// Recurring behaviors with how often they showed up.
    pub pattern_matrix: Vec<PatternEntry>,
    /// Drain/gain scores and a short narrative.
    pub energy_balance: EnergyBalance,
    /// One small concrete step the user could take this week.
    pub low_effort_action: String,
}

impl LifeSnapshot {
    /// Normalize a freshly decoded snapshot (score clamping).
    pub fn normalized(mut self) -> Self {
        self.energy_balance = self.energy_balance.clamped();
        self
    }
}
