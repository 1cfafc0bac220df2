//! The session flow: stages and the controller that walks them.

mod controller;
mod stage;

pub use controller::{ControllerError, EntryDetails, FlowController, TurnOutcome};
pub use stage::Stage;

use std::time::Duration;

/// The fixed animated sequence shown during the Matching stage. The flow
/// advances to the marketplace only after every step has played.
pub const MATCHING_STEPS: [&str; 4] = [
    "Reading your snapshot",
    "Scanning mentor specialties",
    "Weighing conversation patterns",
    "Locking in your matches",
];

/// How long each matching step is displayed.
pub const MATCHING_STEP_DELAY: Duration = Duration::from_millis(900);
