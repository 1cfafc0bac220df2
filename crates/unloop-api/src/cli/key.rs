//! `unloop key` commands: store, clear, and inspect the API key.

use console::style;
use dialoguer::Password;

use crate::state::AppState;

pub async fn set_key(state: &AppState, value: Option<&str>) -> anyhow::Result<()> {
    let chain = state.key_chain();

    let key = match value {
        Some(v) => v.to_string(),
        None => Password::new()
            .with_prompt("Gemini API key")
            .interact()?,
    };

    chain.store(&key).await?;
    println!("  {} API key stored.", style("✓").green());
    Ok(())
}

pub async fn clear_key(state: &AppState) -> anyhow::Result<()> {
    state.key_chain().clear().await?;
    println!("  {} Stored API key removed.", style("✓").green());
    Ok(())
}

pub async fn key_status(state: &AppState, json: bool) -> anyhow::Result<()> {
    let available = state.key_chain().has_key().await;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({ "key_available": available }))?
        );
        return Ok(());
    }

    if available {
        println!("  {} A usable API key is available.", style("✓").green());
    } else {
        println!(
            "  {} No API key found. Set one with: unloop key set",
            style("✗").red()
        );
    }
    Ok(())
}
