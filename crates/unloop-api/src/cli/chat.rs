//! The interactive reflection journey: `unloop chat`.
//!
//! Drives the flow controller stage by stage. Each stage handler renders
//! its screen, gathers input, and asks the controller for a transition;
//! the controller decides what is legal and when the session is
//! persisted. Returning `false` from a handler ends the journey.

use std::time::Duration;

use console::style;
use dialoguer::{Confirm, Input, Password, Select};
use indicatif::{ProgressBar, ProgressStyle};

use unloop_core::catalog;
use unloop_core::flow::{
    ControllerError, EntryDetails, FlowController, MATCHING_STEP_DELAY, MATCHING_STEPS, Stage,
    TurnOutcome,
};
use unloop_core::gateway::{AiGateway, GatewayError};
use unloop_infra::llm::GeminiClient;
use unloop_infra::store::JsonSessionStore;
use unloop_types::error::FlowError;
use unloop_types::session::SessionRecord;
use unloop_types::snapshot::LifeSnapshot;

use crate::state::AppState;

type ChatController = FlowController<GeminiClient, JsonSessionStore>;

const MOODS: [&str; 5] = ["Drained", "Restless", "Stuck", "Hopeful", "Not sure"];
const PRIORITIES: [&str; 5] = [
    "Career",
    "Relationships",
    "Energy & health",
    "Direction",
    "Something else",
];
const TIME_SLOTS: [&str; 4] = ["Mon 10:00", "Tue 14:00", "Wed 16:30", "Thu 09:00"];

pub async fn run_chat(state: &AppState) -> anyhow::Result<()> {
    let store = state.open_store().await?;
    let gateway = AiGateway::new(state.gemini_client(), &state.config);
    let mut ctl = FlowController::new(gateway, store);

    print_landing();
    if state.key_chain().has_key().await {
        ctl.enter_entry();
    } else {
        ctl.enter_key_selection();
    }

    loop {
        let keep_going = match ctl.stage() {
            Stage::Landing => {
                ctl.enter_entry();
                true
            }
            Stage::Entry => entry_stage(&mut ctl)?,
            Stage::KeySelection => key_selection_stage(state, &mut ctl).await?,
            Stage::Discovery => discovery_stage(&mut ctl).await?,
            Stage::Insight => insight_stage(&mut ctl)?,
            Stage::Matching => matching_stage(&mut ctl).await?,
            Stage::Marketplace => marketplace_stage(&mut ctl).await?,
            Stage::MentorProfile => mentor_profile_stage(&mut ctl)?,
            Stage::Connection => connection_stage(&mut ctl).await?,
            Stage::AppointmentDetails => appointment_stage(&mut ctl).await?,
        };
        if !keep_going {
            return Ok(());
        }
    }
}

fn print_landing() {
    println!();
    println!("  {}", style("unloop").magenta().bold());
    println!(
        "  {}",
        style("A short guided conversation about what feels stuck.").dim()
    );
    println!();
}

fn entry_stage(ctl: &mut ChatController) -> anyhow::Result<bool> {
    let mood_idx = Select::new()
        .with_prompt("How are you arriving today?")
        .items(&MOODS)
        .default(0)
        .interact()?;
    let priority_idx = Select::new()
        .with_prompt("What matters most right now?")
        .items(&PRIORITIES)
        .default(0)
        .interact()?;
    let notes: String = Input::new()
        .with_prompt("Anything else before we start? (enter to skip)")
        .allow_empty(true)
        .interact_text()?;

    let consent = Confirm::new()
        .with_prompt("Your conversation is stored locally on this machine. Okay to continue?")
        .default(true)
        .interact()?;
    if !consent {
        println!("  No problem. Nothing was saved.");
        return Ok(false);
    }

    ctl.begin_session(EntryDetails {
        mood: Some(MOODS[mood_idx].to_string()),
        priority: Some(PRIORITIES[priority_idx].to_string()),
        notes: (!notes.trim().is_empty()).then(|| notes.trim().to_string()),
        consent_given: true,
    })?;

    println!();
    println!(
        "  {} Tell me what feels stuck. Type {} when you're ready for your snapshot, {} to leave.",
        style("loop").magenta(),
        style("/snapshot").cyan(),
        style("/quit").cyan()
    );
    println!();
    Ok(true)
}

async fn key_selection_stage(
    state: &AppState,
    ctl: &mut ChatController,
) -> anyhow::Result<bool> {
    println!();
    println!(
        "  {} Unloop can't reach the model right now: the API key is missing, rejected, or out of quota.",
        style("!").yellow().bold()
    );

    let choice = Select::new()
        .with_prompt("How do you want to continue?")
        .items(&["Enter a Gemini API key", "Skip for now", "Quit"])
        .default(0)
        .interact()?;
    match choice {
        0 => {
            let key = Password::new().with_prompt("Gemini API key").interact()?;
            state.key_chain().store(&key).await?;
            println!("  {} Key stored.", style("✓").green());
        }
        1 => {
            // Skipping returns to the entry form; the first model call
            // without a usable key routes back here.
            println!(
                "  {}",
                style("You can add a key any time with `unloop key set`.").dim()
            );
        }
        _ => return Ok(false),
    }

    ctl.resolve_key_selection()?;
    Ok(true)
}

async fn discovery_stage(ctl: &mut ChatController) -> anyhow::Result<bool> {
    while ctl.stage() == Stage::Discovery {
        let line: String = Input::new()
            .with_prompt(style("you").green().to_string())
            .allow_empty(true)
            .interact_text()?;
        let line = line.trim();

        match line {
            "" => continue,
            "/quit" | "/q" => return Ok(false),
            "/snapshot" => {
                let bar = spinner("Reading the whole conversation back...");
                let result = ctl.request_snapshot().await;
                bar.finish_and_clear();
                match result {
                    Ok(_) => return Ok(true),
                    Err(ControllerError::Flow(FlowError::MissingPrecondition(_))) => {
                        println!(
                            "  {}",
                            style("Share a little more first, then ask again.").dim()
                        );
                    }
                    Err(err) => {
                        report_error(&err);
                        if ctl.stage() != Stage::Discovery {
                            return Ok(true);
                        }
                    }
                }
            }
            text => {
                let bar = spinner("Thinking...");
                let result = ctl.send_message(text).await;
                bar.finish_and_clear();
                match result {
                    Ok(TurnOutcome::Reply { text, keywords }) => {
                        println!("  {} {text}", style("loop").magenta());
                        if !keywords.is_empty() {
                            println!("  {}", style(format!("felt: {}", keywords.join(" · "))).dim());
                        }
                        println!();
                    }
                    Ok(TurnOutcome::SafetyEscalation) => print_crisis_notice(),
                    Err(err) => {
                        report_error(&err);
                        if ctl.stage() != Stage::Discovery {
                            return Ok(true);
                        }
                    }
                }
            }
        }
    }
    Ok(true)
}

fn insight_stage(ctl: &mut ChatController) -> anyhow::Result<bool> {
    let Some(snapshot) = ctl.snapshot() else {
        anyhow::bail!("insight stage without a snapshot");
    };
    render_snapshot(snapshot);

    let choice = Select::new()
        .with_prompt("Where to next?")
        .items(&[
            "Find my mentor",
            "Back to the conversation",
            "Done for now",
        ])
        .default(0)
        .interact()?;
    match choice {
        0 => {
            ctl.begin_matching()?;
            Ok(true)
        }
        1 => {
            ctl.back()?;
            Ok(true)
        }
        _ => {
            println!(
                "  Saved. Revisit any time with {}.",
                style("unloop sessions").cyan()
            );
            Ok(false)
        }
    }
}

async fn matching_stage(ctl: &mut ChatController) -> anyhow::Result<bool> {
    println!();
    for step in MATCHING_STEPS {
        let bar = spinner(step);
        tokio::time::sleep(MATCHING_STEP_DELAY).await;
        bar.finish_with_message(format!("{} {step}", style("✓").green()));
    }
    println!();
    ctl.complete_matching()?;
    Ok(true)
}

async fn marketplace_stage(ctl: &mut ChatController) -> anyhow::Result<bool> {
    let ranked = match ctl.snapshot() {
        Some(snapshot) => catalog::ranked_for(snapshot),
        None => anyhow::bail!("marketplace stage without a snapshot"),
    };

    let mut items: Vec<String> = ranked
        .iter()
        .map(|m| format!("{} — {} · {}", m.name, m.mentor_type, m.tagline))
        .collect();
    items.push("← Back to the snapshot".to_string());

    let choice = Select::new()
        .with_prompt("Who feels right?")
        .items(&items)
        .default(0)
        .interact()?;

    if choice == ranked.len() {
        ctl.back()?;
    } else {
        ctl.pick_mentor(&ranked[choice].id).await?;
    }
    Ok(true)
}

fn mentor_profile_stage(ctl: &mut ChatController) -> anyhow::Result<bool> {
    let Some(mentor) = ctl.selected_mentor().cloned() else {
        anyhow::bail!("mentor profile stage without a mentor");
    };

    println!();
    println!(
        "  {} · {}",
        style(&mentor.name).cyan().bold(),
        mentor.mentor_type
    );
    println!("  {}", style(&mentor.tagline).italic());
    println!("  Works with: {}", mentor.specialty);
    println!();
    println!("  {} {}", style("Why this match:").bold(), mentor.match_reason);
    println!();

    let accept = Confirm::new()
        .with_prompt(format!("Connect with {}?", mentor.name))
        .default(true)
        .interact()?;
    if accept {
        ctl.confirm_mentor()?;
    } else {
        ctl.back()?;
    }
    Ok(true)
}

async fn connection_stage(ctl: &mut ChatController) -> anyhow::Result<bool> {
    let mut items: Vec<String> = TIME_SLOTS.iter().map(|s| s.to_string()).collect();
    items.push("← Back to the profile".to_string());

    let choice = Select::new()
        .with_prompt("Pick a time for your first conversation")
        .items(&items)
        .default(0)
        .interact()?;

    if choice == TIME_SLOTS.len() {
        ctl.back()?;
        return Ok(true);
    }

    ctl.book_time(TIME_SLOTS[choice]).await?;
    ctl.open_appointment().await?;
    Ok(true)
}

async fn appointment_stage(ctl: &mut ChatController) -> anyhow::Result<bool> {
    let Some(record) = ctl.session_record() else {
        anyhow::bail!("appointment stage without a session");
    };
    print_appointment(&record);

    let rename = Confirm::new()
        .with_prompt("Give this session a name of your own?")
        .default(false)
        .interact()?;
    if rename {
        let label: String = Input::new().with_prompt("Session name").interact_text()?;
        ctl.rename_label(label.trim()).await?;
    }

    println!(
        "  All set. Look back any time with {}.",
        style("unloop sessions").cyan()
    );
    println!();
    Ok(false)
}

fn render_snapshot(snapshot: &LifeSnapshot) {
    println!();
    println!("  {}", style("Your life snapshot").bold().underlined());
    println!();
    println!(
        "  {} {}",
        style("Theme:").bold(),
        style(&snapshot.primary_theme).cyan()
    );
    println!("  {} {}", style("Bottleneck:").bold(), snapshot.the_bottleneck);
    println!(
        "  {} drains {}/10 · gains {}/10 — {}",
        style("Energy:").bold(),
        snapshot.energy_balance.drains,
        snapshot.energy_balance.gains,
        snapshot.energy_balance.description
    );
    if !snapshot.pattern_matrix.is_empty() {
        println!("  {}", style("Patterns:").bold());
        for entry in &snapshot.pattern_matrix {
            println!(
                "    · {} {}",
                entry.behavior,
                style(format!("({})", entry.frequency)).dim()
            );
        }
    }
    println!(
        "  {} {}",
        style("This week:").bold(),
        style(&snapshot.low_effort_action).green()
    );
    println!();
}

fn print_appointment(record: &SessionRecord) {
    println!();
    println!("  {}", style("You're booked.").green().bold());
    if let Some(mentor) = &record.selected_mentor {
        println!("  Mentor: {} ({})", mentor.name, mentor.mentor_type);
    }
    if let Some(time) = &record.booked_time {
        println!("  Time:   {time}");
    }
    if let Some(label) = &record.label {
        println!("  Session: {label}");
    }
    println!();
}

fn print_crisis_notice() {
    println!();
    println!(
        "  {}",
        style("It sounds like you might be carrying something heavy right now.")
            .yellow()
            .bold()
    );
    println!("  Unloop isn't the right support for a moment like this.");
    println!("  If you are in immediate danger, call your local emergency number.");
    println!("  In the US you can call or text 988 to reach the Suicide & Crisis Lifeline.");
    println!();
}

fn report_error(err: &ControllerError) {
    match err {
        ControllerError::Gateway(GatewayError::Cancelled) => {}
        ControllerError::Gateway(gateway_err) if gateway_err.needs_key_selection() => {
            // The key selection screen explains itself.
            tracing::debug!(error = %gateway_err, "Rerouted to key selection");
        }
        other => {
            println!("  {} {other}", style("error:").red().bold());
        }
    }
}

fn spinner(msg: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("  {spinner:.magenta} {msg}")
            .expect("valid spinner template"),
    );
    bar.set_message(msg.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}
