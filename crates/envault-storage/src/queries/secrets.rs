// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Secret record CRUD operations.

use envault_core::{EnvaultError, SecretFilter, SecretRecord};
use rusqlite::params;
use tracing::debug;

use crate::database::{Database, map_tr_err};

const SECRET_COLUMNS: &str =
    "id, user_id, project_id, name, value, key_id, created_at, updated_at";

fn row_to_secret(row: &rusqlite::Row<'_>) -> Result<SecretRecord, rusqlite::Error> {
    Ok(SecretRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        project_id: row.get(2)?,
        name: row.get(3)?,
        value: row.get(4)?,
        key_id: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn now_timestamp() -> String {
    chrono::Utc::now()
        .format("%Y-%m-%dT%H:%M:%S%.3fZ")
        .to_string()
}

/// Insert a secret, or replace the value of the existing `(user_id, name)` row.
///
/// An empty `record.id` gets a fresh UUID. Returns the id of the stored row,
/// which is the existing row's id on conflict.
pub async fn upsert_secret(db: &Database, record: &SecretRecord) -> Result<String, EnvaultError> {
    let mut record = record.clone();
    if record.id.is_empty() {
        record.id = uuid::Uuid::new_v4().to_string();
    }
    let now = now_timestamp();
    if record.created_at.is_empty() {
        record.created_at = now.clone();
    }
    db.connection()
        .call(move |conn| -> Result<String, rusqlite::Error> {
            conn.query_row(
                "INSERT INTO secrets
                     (id, user_id, project_id, name, value, key_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT (user_id, name) DO UPDATE SET
                     value = excluded.value,
                     key_id = excluded.key_id,
                     project_id = excluded.project_id,
                     updated_at = excluded.updated_at
                 RETURNING id",
                params![
                    record.id,
                    record.user_id,
                    record.project_id,
                    record.name,
                    record.value,
                    record.key_id,
                    record.created_at,
                    now,
                ],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Get a secret by ID.
pub async fn get_secret(db: &Database, id: &str) -> Result<Option<SecretRecord>, EnvaultError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<SecretRecord>, rusqlite::Error> {
            let sql = format!("SELECT {SECRET_COLUMNS} FROM secrets WHERE id = ?1");
            match conn.query_row(&sql, params![id], row_to_secret) {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Get a user's secret by name.
pub async fn find_secret(
    db: &Database,
    user_id: &str,
    name: &str,
) -> Result<Option<SecretRecord>, EnvaultError> {
    let user_id = user_id.to_string();
    let name = name.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<SecretRecord>, rusqlite::Error> {
            let sql =
                format!("SELECT {SECRET_COLUMNS} FROM secrets WHERE user_id = ?1 AND name = ?2");
            match conn.query_row(&sql, params![user_id, name], row_to_secret) {
                Ok(record) => Ok(Some(record)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List secrets matching the filter, ordered by id.
pub async fn list_secrets(
    db: &Database,
    filter: &SecretFilter,
) -> Result<Vec<SecretRecord>, EnvaultError> {
    let filter = filter.clone();
    db.connection()
        .call(move |conn| -> Result<Vec<SecretRecord>, rusqlite::Error> {
            let sql = format!(
                "SELECT {SECRET_COLUMNS} FROM secrets
                 WHERE (?1 IS NULL OR user_id = ?1)
                   AND (?2 IS NULL OR project_id = ?2)
                 ORDER BY id ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![filter.user_id, filter.project_id], row_to_secret)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// List secrets not yet encrypted under `key_id`, legacy rows included.
pub async fn secrets_not_on_key(
    db: &Database,
    key_id: &str,
) -> Result<Vec<SecretRecord>, EnvaultError> {
    let key_id = key_id.to_string();
    db.connection()
        .call(move |conn| -> Result<Vec<SecretRecord>, rusqlite::Error> {
            let sql = format!(
                "SELECT {SECRET_COLUMNS} FROM secrets
                 WHERE key_id IS NULL OR key_id != ?1
                 ORDER BY id ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![key_id], row_to_secret)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Replace a secret's value and key id in a single UPDATE, guarded by the
/// value the caller read.
///
/// Returns `false` without writing when the row was rewritten or deleted
/// since it was read.
pub async fn update_ciphertext(
    db: &Database,
    id: &str,
    expected_value: &str,
    value: &str,
    key_id: &str,
) -> Result<bool, EnvaultError> {
    let secret_id = id.to_string();
    let expected_value = expected_value.to_string();
    let value = value.to_string();
    let key_id = key_id.to_string();
    let now = now_timestamp();
    let updated = db
        .connection()
        .call(move |conn| -> Result<usize, rusqlite::Error> {
            conn.execute(
                "UPDATE secrets SET value = ?1, key_id = ?2, updated_at = ?3
                 WHERE id = ?4 AND value = ?5",
                params![value, key_id, now, secret_id, expected_value],
            )
        })
        .await
        .map_err(map_tr_err)?;
    if updated == 0 {
        debug!(secret_id = %id, "secret changed before ciphertext update");
    }
    Ok(updated > 0)
}

/// Delete a secret owned by `user_id`.
pub async fn delete_secret(db: &Database, user_id: &str, id: &str) -> Result<bool, EnvaultError> {
    let user_id = user_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let removed = conn.execute(
                "DELETE FROM secrets WHERE id = ?1 AND user_id = ?2",
                params![id, user_id],
            )?;
            Ok(removed > 0)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::keys;
    use envault_core::{DataKey, KeyStatus};
    use tempfile::tempdir;

    async fn setup() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("secrets.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn secret(user: &str, name: &str, value: &str, key_id: Option<&str>) -> SecretRecord {
        SecretRecord {
            id: String::new(),
            user_id: user.into(),
            project_id: None,
            name: name.into(),
            value: value.into(),
            key_id: key_id.map(String::from),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    async fn add_key(db: &Database, id: &str) {
        keys::insert_key(
            db,
            &DataKey {
                id: id.into(),
                encrypted_key: "sealed".into(),
                status: KeyStatus::Migrating,
                created_at: "2026-01-01T00:00:00Z".into(),
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn upsert_assigns_id_and_keeps_it_on_conflict() {
        let (db, _dir) = setup().await;
        let id = upsert_secret(&db, &secret("alice", "API_KEY", "one", None))
            .await
            .unwrap();
        assert!(!id.is_empty());

        let mut again = secret("alice", "API_KEY", "two", None);
        again.project_id = Some("p1".into());
        let id2 = upsert_secret(&db, &again).await.unwrap();
        assert_eq!(id, id2);

        let stored = get_secret(&db, &id).await.unwrap().unwrap();
        assert_eq!(stored.value, "two");
        assert_eq!(stored.project_id.as_deref(), Some("p1"));
        assert!(!stored.created_at.is_empty());
    }

    #[tokio::test]
    async fn same_name_for_different_users_is_distinct() {
        let (db, _dir) = setup().await;
        let a = upsert_secret(&db, &secret("alice", "TOKEN", "a", None))
            .await
            .unwrap();
        let b = upsert_secret(&db, &secret("bob", "TOKEN", "b", None))
            .await
            .unwrap();
        assert_ne!(a, b);
        let found = find_secret(&db, "bob", "TOKEN").await.unwrap().unwrap();
        assert_eq!(found.value, "b");
        assert!(find_secret(&db, "carol", "TOKEN").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_filters_by_user_and_project() {
        let (db, _dir) = setup().await;
        let mut in_p1 = secret("alice", "A", "x", None);
        in_p1.project_id = Some("p1".into());
        upsert_secret(&db, &in_p1).await.unwrap();
        upsert_secret(&db, &secret("alice", "B", "y", None))
            .await
            .unwrap();
        upsert_secret(&db, &secret("bob", "C", "z", None))
            .await
            .unwrap();

        assert_eq!(list_secrets(&db, &SecretFilter::default()).await.unwrap().len(), 3);
        assert_eq!(
            list_secrets(&db, &SecretFilter::for_user("alice"))
                .await
                .unwrap()
                .len(),
            2
        );
        let p1 = list_secrets(&db, &SecretFilter::for_user("alice").in_project("p1"))
            .await
            .unwrap();
        assert_eq!(p1.len(), 1);
        assert_eq!(p1[0].name, "A");
    }

    #[tokio::test]
    async fn not_on_key_includes_legacy_rows() {
        let (db, _dir) = setup().await;
        add_key(&db, "k1").await;
        add_key(&db, "k2").await;
        upsert_secret(&db, &secret("u", "LEGACY", "l", None))
            .await
            .unwrap();
        upsert_secret(&db, &secret("u", "OLD", "v1:k1:x", Some("k1")))
            .await
            .unwrap();
        upsert_secret(&db, &secret("u", "NEW", "v1:k2:x", Some("k2")))
            .await
            .unwrap();

        let mut names: Vec<String> = secrets_not_on_key(&db, "k2")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["LEGACY", "OLD"]);
    }

    #[tokio::test]
    async fn update_ciphertext_moves_record_to_key() {
        let (db, _dir) = setup().await;
        add_key(&db, "k9").await;
        let id = upsert_secret(&db, &secret("u", "S", "legacy", None))
            .await
            .unwrap();
        assert!(update_ciphertext(&db, &id, "legacy", "v1:k9:abc", "k9").await.unwrap());

        let stored = get_secret(&db, &id).await.unwrap().unwrap();
        assert_eq!(stored.value, "v1:k9:abc");
        assert!(stored.is_on_key("k9"));
        assert!(secrets_not_on_key(&db, "k9").await.unwrap().is_empty());

        // Missing rows are tolerated.
        assert!(!update_ciphertext(&db, "gone", "v", "v", "k9").await.unwrap());
    }

    #[tokio::test]
    async fn update_ciphertext_skips_rows_rewritten_since_read() {
        let (db, _dir) = setup().await;
        add_key(&db, "k9").await;
        let id = upsert_secret(&db, &secret("u", "S", "first", None))
            .await
            .unwrap();
        upsert_secret(&db, &secret("u", "S", "second", None))
            .await
            .unwrap();

        let written = update_ciphertext(&db, &id, "first", "v1:k9:stale", "k9")
            .await
            .unwrap();
        assert!(!written);

        let stored = get_secret(&db, &id).await.unwrap().unwrap();
        assert_eq!(stored.value, "second");
        assert!(stored.key_id.is_none());
    }

    #[tokio::test]
    async fn delete_requires_owner() {
        let (db, _dir) = setup().await;
        let id = upsert_secret(&db, &secret("alice", "S", "v", None))
            .await
            .unwrap();
        assert!(!delete_secret(&db, "mallory", &id).await.unwrap());
        assert!(delete_secret(&db, "alice", &id).await.unwrap());
        assert!(get_secret(&db, &id).await.unwrap().is_none());
    }
}
