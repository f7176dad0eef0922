// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Data-key registry operations.

use std::str::FromStr;

use envault_core::{DataKey, EnvaultError, KeyStatus};
use rusqlite::params;

use crate::database::{Database, map_tr_err};

const KEY_COLUMNS: &str = "id, encrypted_key, status, created_at";

fn row_to_key(row: &rusqlite::Row<'_>) -> Result<DataKey, rusqlite::Error> {
    let status: String = row.get(2)?;
    let status = KeyStatus::from_str(&status).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(DataKey {
        id: row.get(0)?,
        encrypted_key: row.get(1)?,
        status,
        created_at: row.get(3)?,
    })
}

/// Insert a new data key.
pub async fn insert_key(db: &Database, key: &DataKey) -> Result<(), EnvaultError> {
    let key = key.clone();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT INTO encryption_keys (id, encrypted_key, status, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![key.id, key.encrypted_key, key.status.to_string(), key.created_at],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Get a data key by ID.
pub async fn get_key(db: &Database, id: &str) -> Result<Option<DataKey>, EnvaultError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<Option<DataKey>, rusqlite::Error> {
            let sql = format!("SELECT {KEY_COLUMNS} FROM encryption_keys WHERE id = ?1");
            match conn.query_row(&sql, params![id], row_to_key) {
                Ok(key) => Ok(Some(key)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List keys oldest first, optionally filtered by status.
pub async fn list_keys(
    db: &Database,
    status: Option<KeyStatus>,
) -> Result<Vec<DataKey>, EnvaultError> {
    let status = status.map(|s| s.to_string());
    db.connection()
        .call(move |conn| -> Result<Vec<DataKey>, rusqlite::Error> {
            let sql = format!(
                "SELECT {KEY_COLUMNS} FROM encryption_keys
                 WHERE (?1 IS NULL OR status = ?1)
                 ORDER BY created_at ASC, rowid ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![status], row_to_key)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Retire every other active key and mark `id` active in one transaction.
///
/// Returns the retired ids, or `KeyNotFound` (with nothing changed) when
/// `id` does not exist.
pub async fn promote_exclusive(db: &Database, id: &str) -> Result<Vec<String>, EnvaultError> {
    let key_id = id.to_string();
    let retired = db
        .connection()
        .call(move |conn| -> Result<Option<Vec<String>>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM encryption_keys WHERE id = ?1)",
                params![key_id],
                |row| row.get(0),
            )?;
            if !exists {
                return Ok(None);
            }
            let ids = {
                let mut stmt = tx.prepare(
                    "SELECT id FROM encryption_keys
                     WHERE status = 'active' AND id != ?1
                     ORDER BY created_at ASC, rowid ASC",
                )?;
                let rows = stmt.query_map(params![key_id], |row| row.get::<_, String>(0))?;
                rows.collect::<Result<Vec<_>, _>>()?
            };
            // Retire first: the partial unique index allows one active row.
            tx.execute(
                "UPDATE encryption_keys
                 SET status = 'retired', updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE status = 'active' AND id != ?1",
                params![key_id],
            )?;
            tx.execute(
                "UPDATE encryption_keys
                 SET status = 'active', updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1",
                params![key_id],
            )?;
            tx.commit()?;
            Ok(Some(ids))
        })
        .await
        .map_err(map_tr_err)?;
    retired.ok_or_else(|| EnvaultError::KeyNotFound(id.to_string()))
}
