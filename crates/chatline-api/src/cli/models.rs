//! `chatline models` - show the model catalog, optionally pinging each model.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use chatline_core::llm::registry::ModelCheck;
use chatline_types::llm::ModelInfo;

use crate::state::AppState;

pub async fn list_models(state: &AppState, json: bool, check: bool) -> Result<()> {
    let models = state.chat_service.models();
    let default_model = state.chat_service.default_model();
    let checks = if check {
        Some(state.chat_service.check_models().await)
    } else {
        None
    };

    if json {
        let mut out = serde_json::json!({
            "default_model": default_model,
            "context_limit": state.config.context_limit,
            "models": models,
        });
        if let Some(checks) = &checks {
            out["checks"] = checks
                .iter()
                .map(|c| {
                    serde_json::json!({
                        "id": c.info.id,
                        "ok": c.result.is_ok(),
                        "error": c.result.as_ref().err().map(|e| e.to_string()),
                    })
                })
                .collect();
        }
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if models.is_empty() {
        println!();
        println!(
            "  {} No models registered. Add [[models]] to {}",
            style("!").yellow().bold(),
            style(state.data_dir.join("config.toml").display()).cyan()
        );
        println!();
        return Ok(());
    }

    println!("{}", model_table(&models, default_model, checks.as_deref()));
    Ok(())
}

/// Render the catalog. A `Status` column is added when checks were run.
fn model_table(models: &[ModelInfo], default_model: &str, checks: Option<&[ModelCheck]>) -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let mut header = vec![
        Cell::new("Id").fg(Color::White),
        Cell::new("Provider").fg(Color::White),
        Cell::new("Model").fg(Color::White),
        Cell::new("Default").fg(Color::White),
    ];
    if checks.is_some() {
        header.push(Cell::new("Status").fg(Color::White));
    }
    table.set_header(header);

    for model in models {
        let is_default = if model.id == default_model { "yes" } else { "" };
        let mut row = vec![
            Cell::new(&model.id).fg(Color::Cyan),
            Cell::new(&model.provider),
            Cell::new(&model.model),
            Cell::new(is_default).fg(Color::Green),
        ];
        if let Some(checks) = checks {
            row.push(match checks.iter().find(|c| c.info.id == model.id) {
                Some(ModelCheck { result: Ok(()), .. }) => Cell::new("ok").fg(Color::Green),
                Some(ModelCheck { result: Err(e), .. }) => Cell::new(e).fg(Color::Red),
                None => Cell::new("-"),
            });
        }
        table.add_row(row);
    }

    table
}
