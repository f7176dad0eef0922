// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Secret management subcommands: `set-secret`, `get-secret`,
//! `list-secrets`, `delete-secret`, `keys` and `import`.

use std::path::Path;

use envault_core::{DataKey, EnvaultError, SecretFilter};
use envault_vault::{RevealedSecret, SecretService, mask_secret};
use tracing::info;

use crate::context::AppContext;
use crate::env_file::{ParseResult, parse_env_content};

pub async fn set_secret(
    ctx: &AppContext,
    user: &str,
    project: Option<&str>,
    name: &str,
    value: &str,
) -> Result<(), EnvaultError> {
    let id = ctx
        .secret_service()
        .save_secret(user, name, value, project)
        .await?;
    println!("saved {name} ({id})");
    Ok(())
}

/// Print the decrypted value. A missing secret is reported as an error.
pub async fn get_secret(ctx: &AppContext, user: &str, name: &str) -> Result<(), EnvaultError> {
    match ctx.secret_service().reveal_secret(user, name).await? {
        Some(value) => {
            println!("{value}");
            Ok(())
        }
        None => Err(EnvaultError::SecretNotFound {
            user_id: user.to_string(),
            name: name.to_string(),
        }),
    }
}

pub async fn list_secrets(
    ctx: &AppContext,
    user: &str,
    project: Option<&str>,
) -> Result<(), EnvaultError> {
    let mut filter = SecretFilter::for_user(user);
    if let Some(project) = project {
        filter = filter.in_project(project);
    }
    let secrets = ctx.secret_service().list_revealed(&filter).await?;
    if secrets.is_empty() {
        println!("no secrets");
    }
    for secret in &secrets {
        println!("{}", format_listing(secret));
    }
    Ok(())
}

/// One listing line: id, name, optional project, masked value.
pub fn format_listing(secret: &RevealedSecret) -> String {
    let value = match &secret.value {
        Some(v) => mask_secret(v),
        None => "<unreadable>".to_string(),
    };
    match &secret.project_id {
        Some(project) => format!("{}  {}  [{}]  {}", secret.id, secret.name, project, value),
        None => format!("{}  {}  {}", secret.id, secret.name, value),
    }
}

pub async fn delete_secret(ctx: &AppContext, user: &str, id: &str) -> Result<(), EnvaultError> {
    if ctx.secret_service().delete_secret(user, id).await? {
        println!("deleted {id}");
    } else {
        println!("no secret {id} for user {user}");
    }
    Ok(())
}

pub async fn list_keys(ctx: &AppContext) -> Result<(), EnvaultError> {
    let keys = ctx.cipher().registry().list_keys().await?;
    if keys.is_empty() {
        println!("no data keys (secrets are sealed under the master key)");
    }
    for key in &keys {
        println!("{}", format_key(key));
    }
    Ok(())
}

pub fn format_key(key: &DataKey) -> String {
    format!("{}  {:<9}  {}", key.id, key.status.to_string(), key.created_at)
}

/// Outcome of an import: names stored plus the parse errors.
#[derive(Debug, Default)]
pub struct ImportSummary {
    pub imported: Vec<String>,
    pub parsed: ParseResult,
}

/// Parse a `.env` file and store every variable as a secret.
pub async fn import_file(
    ctx: &AppContext,
    user: &str,
    project: Option<&str>,
    path: &Path,
) -> Result<(), EnvaultError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| EnvaultError::FormatInvalid(format!("cannot read {}: {e}", path.display())))?;

    let summary = import_content(&ctx.secret_service(), user, project, &content).await?;
    for error in &summary.parsed.errors {
        eprintln!("line {}: {} ({})", error.line, error.error, error.content.trim());
    }
    let likely_secrets = summary.parsed.variables.iter().filter(|v| v.is_secret).count();
    println!(
        "imported {} variable(s) ({} likely secret), {} error(s)",
        summary.imported.len(),
        likely_secrets,
        summary.parsed.errors.len()
    );
    Ok(())
}

pub async fn import_content(
    service: &SecretService,
    user: &str,
    project: Option<&str>,
    content: &str,
) -> Result<ImportSummary, EnvaultError> {
    let parsed = parse_env_content(content);
    let mut imported = Vec::with_capacity(parsed.variables.len());
    for var in &parsed.variables {
        service.save_secret(user, &var.key, &var.value, project).await?;
        imported.push(var.key.clone());
    }
    info!(
        imported = imported.len(),
        errors = parsed.errors.len(),
        "env file imported"
    );
    Ok(ImportSummary { imported, parsed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use envault_core::KeyStatus;
    use envault_storage::SqliteStore;
    use envault_test_utils::TEST_MASTER_KEY_HEX;
    use envault_vault::MasterKey;

    async fn context(dir: &tempfile::TempDir) -> AppContext {
        let config = envault_config::model::StorageConfig {
            database_path: dir.path().join("cli.db").to_str().unwrap().to_string(),
            wal_mode: true,
        };
        let store = Arc::new(SqliteStore::open(config).await.unwrap());
        AppContext::with_store(store, MasterKey::from_hex(TEST_MASTER_KEY_HEX).unwrap())
    }

    #[tokio::test]
    async fn import_stores_parsed_variables_and_keeps_errors() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir).await;
        let service = ctx.secret_service();

        let content = "api_key=sk-abcdefghijklmnop\n# note\nbroken line\nPORT=8080\n";
        let summary = import_content(&service, "alice", Some("web"), content)
            .await
            .unwrap();

        assert_eq!(summary.imported, vec!["API_KEY", "PORT"]);
        assert_eq!(summary.parsed.errors.len(), 1);
        assert_eq!(summary.parsed.errors[0].line, 3);

        assert_eq!(
            service.reveal_secret("alice", "API_KEY").await.unwrap().as_deref(),
            Some("sk-abcdefghijklmnop")
        );
        let listed = service
            .list_secrets(&SecretFilter::for_user("alice").in_project("web"))
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
    }

    #[tokio::test]
    async fn reimport_overwrites_existing_names() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir).await;
        let service = ctx.secret_service();

        import_content(&service, "alice", None, "TOKEN=one").await.unwrap();
        import_content(&service, "alice", None, "TOKEN=two").await.unwrap();

        let listed = service
            .list_secrets(&SecretFilter::for_user("alice"))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(
            service.reveal_secret("alice", "TOKEN").await.unwrap().as_deref(),
            Some("two")
        );
    }

    #[tokio::test]
    async fn get_missing_secret_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(&dir).await;
        let err = get_secret(&ctx, "alice", "NOPE").await.unwrap_err();
        assert!(matches!(
            err,
            EnvaultError::SecretNotFound { ref user_id, ref name } if user_id == "alice" && name == "NOPE"
        ));
        assert!(!err.is_undecryptable());
    }

    #[test]
    fn listing_masks_values() {
        let line = format_listing(&RevealedSecret {
            id: "id1".into(),
            name: "OPENAI_KEY".into(),
            project_id: Some("web".into()),
            value: Some("sk-abcdefghijklmnop".into()),
        });
        assert_eq!(line, "id1  OPENAI_KEY  [web]  sk-a...mnop");
        assert!(!line.contains("abcdefgh"));
    }

    #[test]
    fn listing_marks_unreadable_values() {
        let line = format_listing(&RevealedSecret {
            id: "id2".into(),
            name: "X".into(),
            project_id: None,
            value: None,
        });
        assert_eq!(line, "id2  X  <unreadable>");
    }

    #[test]
    fn key_line_shows_status() {
        let line = format_key(&DataKey {
            id: "k1".into(),
            encrypted_key: "sealed".into(),
            status: KeyStatus::Active,
            created_at: "2026-01-01T00:00:00Z".into(),
        });
        assert!(line.starts_with("k1  active"));
        assert!(!line.contains("sealed"));
    }
}
