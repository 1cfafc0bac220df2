//! The flow controller: one in-memory session workspace walked through
//! the stage graph.
//!
//! The controller owns the transient state of the active session and is
//! the only writer of it. Persistence is one-way: whenever the workspace
//! has a non-empty history and a snapshot, it is upserted into the store
//! keyed by the session id. Starting a new session clears the workspace,
//! mints a fresh id, and cancels the previous session's token so a late
//! model reply can never land in the new workspace.

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use unloop_types::error::{FlowError, StoreError};
use unloop_types::mentor::Mentor;
use unloop_types::session::{SessionPatch, SessionRecord};
use unloop_types::snapshot::LifeSnapshot;
use unloop_types::turn::{ConversationTurn, TurnRole};

use crate::catalog;
use crate::client::GenerativeClient;
use crate::gateway::{AiGateway, GatewayError, TurnReply};
use crate::store::SessionStore;

use super::Stage;

/// Anything a flow operation can fail with.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What the user fills in on the entry form.
#[derive(Debug, Clone, Default)]
pub struct EntryDetails {
    pub mood: Option<String>,
    pub priority: Option<String>,
    pub notes: Option<String>,
    pub consent_given: bool,
}

/// Outcome of one dialogue turn, from the caller's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Reply {
        text: String,
        /// Best-effort emotional keywords for the user's message; empty
        /// when extraction was skipped or failed.
        keywords: Vec<String>,
    },
    /// The model flagged the message as a crisis signal. The caller shows
    /// the crisis notice; nothing was appended to the history.
    SafetyEscalation,
}

/// Transient per-session state. Lives only while the session is active;
/// the persisted form is [`SessionRecord`].
struct ActiveSession {
    id: Uuid,
    created_at: DateTime<Utc>,
    cancel: CancellationToken,
    history: Vec<ConversationTurn>,
    snapshot: Option<LifeSnapshot>,
    selected_mentor: Option<Mentor>,
    booked_time: Option<String>,
    label: Option<String>,
    consent_given: bool,
    user_mood: Option<String>,
    user_priority: Option<String>,
    user_notes: Option<String>,
}

impl ActiveSession {
    fn start(details: EntryDetails) -> Self {
        Self {
            id: Uuid::now_v7(),
            created_at: Utc::now(),
            cancel: CancellationToken::new(),
            history: Vec::new(),
            snapshot: None,
            selected_mentor: None,
            booked_time: None,
            label: None,
            consent_given: details.consent_given,
            user_mood: details.mood,
            user_priority: details.priority,
            user_notes: details.notes,
        }
    }

    fn to_record(&self) -> SessionRecord {
        SessionRecord {
            id: self.id,
            created_at: self.created_at,
            label: self.label.clone(),
            history: self.history.clone(),
            snapshot: self.snapshot.clone(),
            selected_mentor: self.selected_mentor.clone(),
            booked_time: self.booked_time.clone(),
            consent_given: self.consent_given,
            user_mood: self.user_mood.clone(),
            user_priority: self.user_priority.clone(),
            user_notes: self.user_notes.clone(),
        }
    }
}

/// Walks one user through the reflection journey.
///
/// Generic over the model client and the store so tests inject mocks and
/// the binary injects Gemini plus the JSON-file store.
pub struct FlowController<C: GenerativeClient, S: SessionStore> {
    gateway: AiGateway<C>,
    store: S,
    stage: Stage,
    session: Option<ActiveSession>,
}

impl<C: GenerativeClient, S: SessionStore> FlowController<C, S> {
    pub fn new(gateway: AiGateway<C>, store: S) -> Self {
        Self {
            gateway,
            store,
            stage: Stage::Landing,
            session: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|s| s.id)
    }

    pub fn history(&self) -> &[ConversationTurn] {
        self.session.as_ref().map(|s| s.history.as_slice()).unwrap_or(&[])
    }

    pub fn snapshot(&self) -> Option<&LifeSnapshot> {
        self.session.as_ref().and_then(|s| s.snapshot.as_ref())
    }

    pub fn selected_mentor(&self) -> Option<&Mentor> {
        self.session.as_ref().and_then(|s| s.selected_mentor.as_ref())
    }

    pub fn booked_time(&self) -> Option<&str> {
        self.session.as_ref().and_then(|s| s.booked_time.as_deref())
    }

    pub fn label(&self) -> Option<&str> {
        self.session.as_ref().and_then(|s| s.label.as_deref())
    }

    /// Snapshot of the workspace as it would be persisted.
    pub fn session_record(&self) -> Option<SessionRecord> {
        self.session.as_ref().map(ActiveSession::to_record)
    }

    /// Move to the entry form. Allowed from anywhere; the workspace is
    /// only reset once the form is submitted.
    pub fn enter_entry(&mut self) {
        self.stage = Stage::Entry;
    }

    /// Reactively enter the key recovery stage.
    pub fn enter_key_selection(&mut self) {
        tracing::info!(from = %self.stage, "Rerouting to key selection");
        self.stage = Stage::KeySelection;
    }

    /// Leave key recovery, resolved or skipped, back to the entry form.
    pub fn resolve_key_selection(&mut self) -> Result<(), FlowError> {
        if self.stage != Stage::KeySelection {
            return Err(self.invalid(Stage::Entry));
        }
        self.stage = Stage::Entry;
        Ok(())
    }

    /// Submit the entry form: clear the workspace, mint a new session id,
    /// cancel the previous session's token, and enter Discovery.
    pub fn begin_session(&mut self, details: EntryDetails) -> Result<Uuid, FlowError> {
        if self.stage != Stage::Entry {
            return Err(self.invalid(Stage::Discovery));
        }
        if !details.consent_given {
            return Err(FlowError::MissingPrecondition(
                "consent to process the conversation",
            ));
        }
        if let Some(old) = self.session.take() {
            old.cancel.cancel();
        }
        let session = ActiveSession::start(details);
        let id = session.id;
        tracing::info!(session_id = %id, "Session started");
        self.session = Some(session);
        self.stage = Stage::Discovery;
        Ok(id)
    }

    /// Send one user message and append the exchange to the history.
    ///
    /// A quota or auth failure reroutes to key selection before the error
    /// is returned. A safety escalation appends nothing.
    pub async fn send_message(&mut self, text: &str) -> Result<TurnOutcome, ControllerError> {
        if self.stage != Stage::Discovery {
            return Err(self.invalid(Stage::Discovery).into());
        }
        let Some(session) = self.session.as_mut() else {
            return Err(FlowError::MissingPrecondition("an active session").into());
        };
        let cancel = session.cancel.clone();

        let reply = match self.gateway.send_turn(&cancel, &session.history, text).await {
            Ok(reply) => reply,
            Err(err) => {
                if err.needs_key_selection() {
                    self.enter_key_selection();
                }
                return Err(err.into());
            }
        };

        match reply {
            TurnReply::SafetyEscalation => Ok(TurnOutcome::SafetyEscalation),
            TurnReply::Text(reply_text) => {
                let keywords = self.gateway.extract_keywords(&cancel, text).await;
                let session = self.session.as_mut().expect("session checked above");
                session
                    .history
                    .push(ConversationTurn::new(TurnRole::User, text));
                session
                    .history
                    .push(ConversationTurn::new(TurnRole::Model, reply_text.clone()));
                self.sync_store().await?;
                Ok(TurnOutcome::Reply {
                    text: reply_text,
                    keywords,
                })
            }
        }
    }

    /// Generate the life snapshot and advance to Insight.
    ///
    /// Requires at least one completed exchange. The label defaults to
    /// the snapshot's primary theme the first time only.
    pub async fn request_snapshot(&mut self) -> Result<&LifeSnapshot, ControllerError> {
        if self.stage != Stage::Discovery {
            return Err(self.invalid(Stage::Insight).into());
        }
        let Some(session) = self.session.as_mut() else {
            return Err(FlowError::MissingPrecondition("an active session").into());
        };
        if session.history.len() < 2 {
            return Err(
                FlowError::MissingPrecondition("at least one completed exchange").into(),
            );
        }
        let cancel = session.cancel.clone();

        let snapshot = match self.gateway.generate_snapshot(&cancel, &session.history).await {
            Ok(snapshot) => snapshot,
            Err(err) => {
                if err.needs_key_selection() {
                    self.enter_key_selection();
                }
                return Err(err.into());
            }
        };

        let session = self.session.as_mut().expect("session checked above");
        if session.label.is_none() {
            session.label = Some(snapshot.primary_theme.clone());
        }
        session.snapshot = Some(snapshot);
        self.stage = Stage::Insight;
        self.sync_store().await?;
        Ok(self
            .session
            .as_ref()
            .and_then(|s| s.snapshot.as_ref())
            .expect("snapshot just set"))
    }

    /// Enter the matching animation.
    pub fn begin_matching(&mut self) -> Result<(), FlowError> {
        if self.stage != Stage::Insight || self.snapshot().is_none() {
            return Err(self.invalid(Stage::Matching));
        }
        self.stage = Stage::Matching;
        Ok(())
    }

    /// The animated sequence finished; advance to the marketplace.
    pub fn complete_matching(&mut self) -> Result<(), FlowError> {
        if self.stage != Stage::Matching {
            return Err(self.invalid(Stage::Marketplace));
        }
        self.stage = Stage::Marketplace;
        Ok(())
    }

    /// Pick a mentor from the catalog and open their profile.
    pub async fn pick_mentor(&mut self, mentor_id: &str) -> Result<(), ControllerError> {
        if self.stage != Stage::Marketplace {
            return Err(self.invalid(Stage::MentorProfile).into());
        }
        let Some(mentor) = catalog::find(mentor_id) else {
            return Err(FlowError::MissingPrecondition("a mentor matching the picked id").into());
        };
        let session = self
            .session
            .as_mut()
            .ok_or(FlowError::MissingPrecondition("an active session"))?;
        session.selected_mentor = Some(mentor.clone());
        self.stage = Stage::MentorProfile;
        self.sync_store().await?;
        Ok(())
    }

    /// Accept the mentor and move to the connection screen.
    pub fn confirm_mentor(&mut self) -> Result<(), FlowError> {
        if self.stage != Stage::MentorProfile || self.selected_mentor().is_none() {
            return Err(self.invalid(Stage::Connection));
        }
        self.stage = Stage::Connection;
        Ok(())
    }

    /// Book a time slot. A modal sub-flow: the stage does not change.
    pub async fn book_time(&mut self, time: &str) -> Result<(), ControllerError> {
        if self.stage != Stage::Connection {
            return Err(self.invalid(Stage::Connection).into());
        }
        let session = self
            .session
            .as_mut()
            .ok_or(FlowError::MissingPrecondition("an active session"))?;
        if session.selected_mentor.is_none() {
            return Err(FlowError::MissingPrecondition("a selected mentor").into());
        }
        session.booked_time = Some(time.to_string());
        self.sync_store().await?;
        Ok(())
    }

    /// Open the appointment details for the current session.
    ///
    /// Requires the session to have been persisted; the workspace alone
    /// is not enough to show a confirmed appointment.
    pub async fn open_appointment(&mut self) -> Result<SessionRecord, ControllerError> {
        if self.stage != Stage::Connection {
            return Err(self.invalid(Stage::AppointmentDetails).into());
        }
        let Some(id) = self.session_id() else {
            return Err(FlowError::MissingPrecondition("an active session").into());
        };
        let records = self.store.load().await?;
        let Some(record) = records.into_iter().find(|r| r.id == id) else {
            return Err(FlowError::MissingPrecondition("a persisted session record").into());
        };
        self.stage = Stage::AppointmentDetails;
        Ok(record)
    }

    /// Navigate one step back, where the current stage has a back edge.
    pub fn back(&mut self) -> Result<Stage, FlowError> {
        match self.stage.back_target() {
            Some(target) => {
                self.stage = target;
                Ok(target)
            }
            None => Err(FlowError::MissingPrecondition("a stage with a back edge")),
        }
    }

    /// Rename the session label.
    ///
    /// The snapshot path only fills the label while it is unset, so the
    /// rename is never overwritten later.
    pub async fn rename_label(&mut self, label: &str) -> Result<(), ControllerError> {
        let session = self
            .session
            .as_mut()
            .ok_or(FlowError::MissingPrecondition("an active session"))?;
        session.label = Some(label.to_string());
        let id = session.id;
        // No-op until the record's first upsert has happened.
        self.store.patch(id, &SessionPatch::rename(label)).await?;
        Ok(())
    }

    /// Persist the workspace once it is substantial enough: non-empty
    /// history and a snapshot present.
    async fn sync_store(&self) -> Result<(), StoreError> {
        let Some(session) = &self.session else {
            return Ok(());
        };
        if session.history.is_empty() || session.snapshot.is_none() {
            return Ok(());
        }
        self.store.upsert(&session.to_record()).await
    }

    fn invalid(&self, to: Stage) -> FlowError {
        FlowError::InvalidTransition {
            from: self.stage.to_string(),
            to: to.to_string(),
        }
    }
}
