//! Mentor catalog types for Unloop.
//!
//! Mentors are static reference data -- a hardcoded catalog, never derived
//! from a session and never loaded from an external source. The catalog
//! itself lives in unloop-core; these are just the shapes.

use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// The coaching style a mentor offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentorType {
    Listener,
    DomainStrategist,
    ClarityArchitect,
}

impl fmt::Display for MentorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MentorType::Listener => write!(f, "Listener"),
            MentorType::DomainStrategist => write!(f, "Domain Strategist"),
            MentorType::ClarityArchitect => write!(f, "Clarity Architect"),
        }
    }
}

impl FromStr for MentorType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace([' ', '-'], "_").as_str() {
            "listener" => Ok(MentorType::Listener),
            "domain_strategist" => Ok(MentorType::DomainStrategist),
            "clarity_architect" => Ok(MentorType::ClarityArchitect),
            other => Err(format!("invalid mentor type: '{other}'")),
        }
    }
}

/// A catalog entry for a bookable mentor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mentor {
    pub id: String,
    pub name: String,
    pub mentor_type: MentorType,
    pub tagline: String,
    pub specialty: String,
    /// Why this mentor suits the user, shown on the profile screen.
    pub match_reason: String,
}
