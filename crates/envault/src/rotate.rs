// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `envault rotate-keys` command implementation.
//!
//! Runs one key rotation and reports `{success, migratedCount, newKeyId}`
//! on success or `{error}` with exit status 1 on failure.

use envault_config::model::EnvaultConfig;
use envault_core::EnvaultError;
use envault_vault::RotationReport;
use serde::Serialize;

use crate::context::AppContext;

/// Structured failure output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct RotationFailure {
    pub error: String,
}

/// Run the `envault rotate-keys` command and return the process exit code.
pub async fn run_rotate(config: &EnvaultConfig, json: bool) -> i32 {
    let outcome = rotate(config).await;
    let (text, code) = render_outcome(&outcome, json);
    match code {
        0 => println!("{text}"),
        _ => eprintln!("{text}"),
    }
    code
}

async fn rotate(config: &EnvaultConfig) -> Result<RotationReport, EnvaultError> {
    let ctx = AppContext::open(config).await?;
    let result = ctx.orchestrator(config).rotate().await;
    finish(result, ctx.close().await)
}

/// The rotation outcome stands whether or not the database closed cleanly.
fn finish(
    result: Result<RotationReport, EnvaultError>,
    closed: Result<(), EnvaultError>,
) -> Result<RotationReport, EnvaultError> {
    if let Err(e) = closed {
        tracing::warn!(error = %e, "failed to close database after rotation");
    }
    result
}

/// Format a rotation outcome. Returns the text to print and the exit code.
pub fn render_outcome(outcome: &Result<RotationReport, EnvaultError>, json: bool) -> (String, i32) {
    match (outcome, json) {
        (Ok(report), true) => (to_json(report), 0),
        (Ok(report), false) => {
            let mut text = format!(
                "rotation complete: {} migrated, {} already current, new key {}",
                report.migrated_count, report.skipped_count, report.new_key_id
            );
            if report.resumed {
                text.push_str(" (resumed)");
            }
            if !report.retired_key_ids.is_empty() {
                text.push_str(&format!("\nretired: {}", report.retired_key_ids.join(", ")));
            }
            (text, 0)
        }
        (Err(e), true) => (
            to_json(&RotationFailure {
                error: e.to_string(),
            }),
            1,
        ),
        (Err(e), false) => (format!("error: {e}"), 1),
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\":\"{e}\"}}"))
}
