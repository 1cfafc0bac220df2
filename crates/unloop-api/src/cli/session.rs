//! `unloop sessions` commands: list, show, and rename saved sessions.

use chrono::Local;
use comfy_table::{Cell, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use console::style;

use unloop_core::store::SessionStore;
use unloop_types::session::{SessionPatch, SessionRecord};

use crate::state::AppState;

pub async fn list_sessions(state: &AppState, json: bool) -> anyhow::Result<()> {
    let store = state.open_store().await?;
    let records = store.load().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!();
        println!(
            "  No sessions yet. Start one with: {}",
            style("unloop chat").cyan()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Id", "Created", "Label", "Turns", "Mentor", "Booked"]);

    for record in &records {
        table.add_row(vec![
            Cell::new(short_id(record)),
            Cell::new(
                record
                    .created_at
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string(),
            ),
            Cell::new(record.label.as_deref().unwrap_or("-")),
            Cell::new(record.history.len().to_string()),
            Cell::new(
                record
                    .selected_mentor
                    .as_ref()
                    .map(|m| m.name.as_str())
                    .unwrap_or("-"),
            ),
            Cell::new(record.booked_time.as_deref().unwrap_or("-")),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    Ok(())
}

pub async fn show_session(state: &AppState, id: &str, json: bool) -> anyhow::Result<()> {
    let store = state.open_store().await?;
    let record = find_by_prefix(&store.load().await?, id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} {}",
        style("Session").bold(),
        style(record.label.as_deref().unwrap_or("(unlabeled)")).cyan()
    );
    println!("  {} {}", style("Id:").dim(), record.id);
    println!(
        "  {} {}",
        style("Created:").dim(),
        record
            .created_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
    );
    if let Some(mood) = &record.user_mood {
        println!("  {} {mood}", style("Mood:").dim());
    }
    if let Some(priority) = &record.user_priority {
        println!("  {} {priority}", style("Priority:").dim());
    }

    if let Some(snapshot) = &record.snapshot {
        println!();
        println!("  {}", style("Life snapshot").bold());
        println!("  Theme:      {}", snapshot.primary_theme);
        println!("  Bottleneck: {}", snapshot.the_bottleneck);
        println!(
            "  Energy:     drains {}/10, gains {}/10",
            snapshot.energy_balance.drains, snapshot.energy_balance.gains
        );
        for entry in &snapshot.pattern_matrix {
            println!("  Pattern:    {} ({})", entry.behavior, entry.frequency);
        }
        println!("  Next step:  {}", snapshot.low_effort_action);
    }

    if let Some(mentor) = &record.selected_mentor {
        println!();
        println!(
            "  {} {} ({})",
            style("Mentor").bold(),
            mentor.name,
            mentor.mentor_type
        );
        if let Some(time) = &record.booked_time {
            println!("  Booked:    {time}");
        }
    }

    if !record.history.is_empty() {
        println!();
        println!("  {}", style("Conversation").bold());
        for turn in &record.history {
            let role = match turn.role {
                unloop_types::turn::TurnRole::User => style("you ").green(),
                _ => style("loop").magenta(),
            };
            println!("  {role} {}", turn.content);
        }
    }
    println!();
    Ok(())
}

pub async fn rename_session(
    state: &AppState,
    id: &str,
    label: &str,
    json: bool,
) -> anyhow::Result<()> {
    let store = state.open_store().await?;
    let record = find_by_prefix(&store.load().await?, id)?;

    store
        .patch(record.id, &SessionPatch::rename(label))
        .await?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(
                &serde_json::json!({ "id": record.id, "label": label })
            )?
        );
    } else {
        println!("  {} Session renamed to '{label}'.", style("✓").green());
    }
    Ok(())
}

fn short_id(record: &SessionRecord) -> String {
    record.id.to_string().chars().take(8).collect()
}

/// Match a session by full id or unique id prefix.
fn find_by_prefix(records: &[SessionRecord], prefix: &str) -> anyhow::Result<SessionRecord> {
    let matches: Vec<&SessionRecord> = records
        .iter()
        .filter(|r| r.id.to_string().starts_with(prefix))
        .collect();
    match matches.as_slice() {
        [] => anyhow::bail!("no session matches '{prefix}'"),
        [one] => Ok((*one).clone()),
        many => anyhow::bail!("'{prefix}' is ambiguous ({} sessions match)", many.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn record() -> SessionRecord {
        SessionRecord::new(Uuid::now_v7())
    }

    #[test]
    fn test_find_by_prefix_unique() {
        let a = record();
        let b = record();
        let records = vec![a.clone(), b.clone()];
        let full = a.id.to_string();
        let found = find_by_prefix(&records, &full).unwrap();
        assert_eq!(found.id, a.id);
    }

    #[test]
    fn test_find_by_prefix_missing() {
        let records = vec![record()];
        assert!(find_by_prefix(&records, "ffffffff").is_err());
    }

    #[test]
    fn test_find_by_prefix_ambiguous() {
        let a = record();
        let b = record();
        // Version 7 ids made in the same instant share a timestamp prefix.
        let shared: String = a
            .id
            .to_string()
            .chars()
            .zip(b.id.to_string().chars())
            .take_while(|(x, y)| x == y)
            .map(|(x, _)| x)
            .collect();
        if shared.is_empty() {
            return; // ids diverged immediately; nothing to assert
        }
        let records = vec![a, b];
        assert!(find_by_prefix(&records, &shared).is_err());
    }
}
