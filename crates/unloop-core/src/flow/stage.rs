//! The closed set of application stages.

use std::fmt;

/// Where the user is in the reflection journey.
///
/// Stages form a mostly linear path with explicit back edges; the
/// controller owns which transitions are legal and what data each stage
/// requires on entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Initial screen, no data required.
    Landing,
    /// Mood/priority/consent form before the conversation starts.
    Entry,
    /// Recovery stage entered whenever the key probe or a quota-class
    /// error says the model cannot be reached.
    KeySelection,
    /// The open conversation. Requires a minted session id.
    Discovery,
    /// The life snapshot view. Requires a snapshot.
    Insight,
    /// Fixed animated matching sequence. Requires a snapshot.
    Matching,
    /// The mentor catalog. Requires a snapshot.
    Marketplace,
    /// One mentor's profile. Requires a snapshot and a picked mentor.
    MentorProfile,
    /// The pre-booking confirmation. Requires a snapshot and a mentor.
    Connection,
    /// Details of a booked appointment. Requires a persisted record.
    AppointmentDetails,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Landing => "Landing",
            Stage::Entry => "Entry",
            Stage::KeySelection => "Key Selection",
            Stage::Discovery => "Discovery",
            Stage::Insight => "Insight",
            Stage::Matching => "Matching",
            Stage::Marketplace => "Marketplace",
            Stage::MentorProfile => "Mentor Profile",
            Stage::Connection => "Connection",
            Stage::AppointmentDetails => "Appointment Details",
        };
        f.write_str(name)
    }
}

impl Stage {
    /// The stage `back` navigates to, if this stage has a back edge.
    pub fn back_target(self) -> Option<Stage> {
        match self {
            Stage::Insight => Some(Stage::Discovery),
            Stage::Marketplace => Some(Stage::Insight),
            Stage::MentorProfile => Some(Stage::Marketplace),
            Stage::Connection => Some(Stage::MentorProfile),
            Stage::AppointmentDetails => Some(Stage::Insight),
            _ => None,
        }
    }
}
