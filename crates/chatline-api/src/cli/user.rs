//! User provisioning commands: add, guest, key.

use anyhow::{Context, Result};
use console::style;

use chatline_types::user::User;

use crate::state::AppState;

fn print_key(user: &User, api_key: &str, json: bool) -> Result<()> {
    if json {
        let out = serde_json::json!({
            "user_id": user.id,
            "email": user.email,
            "kind": user.kind(),
            "api_key": api_key,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} API key for {} (save this -- it won't be shown again):",
        style("🔑").bold(),
        style(&user.email).cyan()
    );
    println!();
    println!("  {}", style(api_key).yellow().bold());
    println!();
    Ok(())
}

/// Create a regular user and issue its first key.
pub async fn add_user(state: &AppState, email: &str, key_name: &str, json: bool) -> Result<()> {
    let user = state.user_repo.create_user(email).await?;
    let api_key = state.user_repo.issue_api_key(&user.id, key_name).await?;
    print_key(&user, &api_key, json)
}

/// Create a guest user and issue its key.
pub async fn add_guest(state: &AppState, json: bool) -> Result<()> {
    let user = state.user_repo.create_guest().await?;
    let api_key = state.user_repo.issue_api_key(&user.id, "guest").await?;
    print_key(&user, &api_key, json)
}

/// Issue an additional key for an existing user.
pub async fn issue_key(state: &AppState, email: &str, key_name: &str, json: bool) -> Result<()> {
    let user = state
        .user_repo
        .get_user_by_email(email)
        .await?
        .with_context(|| format!("no user with email '{email}'"))?;
    let api_key = state.user_repo.issue_api_key(&user.id, key_name).await?;
    print_key(&user, &api_key, json)
}
