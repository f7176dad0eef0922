// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-row lease that serializes rotation runs across processes.
//!
//! The lease records its holder and the unix time it was taken. A lease
//! older than the caller's TTL is considered abandoned (the holding process
//! crashed) and may be taken over.

use envault_core::EnvaultError;
use rusqlite::params;
use tracing::warn;

use crate::database::{Database, map_tr_err};

/// Try to take the lease. Re-acquiring one's own lease refreshes it.
pub async fn try_acquire(db: &Database, holder: &str, ttl_secs: u64) -> Result<bool, EnvaultError> {
    try_acquire_at(db, holder, ttl_secs, chrono::Utc::now().timestamp()).await
}

pub(crate) async fn try_acquire_at(
    db: &Database,
    holder: &str,
    ttl_secs: u64,
    now: i64,
) -> Result<bool, EnvaultError> {
    let holder = holder.to_string();
    let ttl = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
    let outcome = db
        .connection()
        .call(move |conn| -> Result<Option<Option<String>>, rusqlite::Error> {
            let tx = conn.transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;
            let current = match tx.query_row(
                "SELECT holder, acquired_at FROM rotation_lock WHERE id = 1",
                [],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            ) {
                Ok(row) => Some(row),
                Err(rusqlite::Error::QueryReturnedNoRows) => None,
                Err(e) => return Err(e),
            };

            // Outer None: lease is held by someone else.
            // Inner Some: an expired lease of that holder was taken over.
            let outcome = match current {
                None => Some(None),
                Some((current_holder, _)) if current_holder == holder => Some(None),
                Some((current_holder, acquired_at)) if now.saturating_sub(acquired_at) >= ttl => {
                    Some(Some(current_holder))
                }
                Some(_) => None,
            };
            if outcome.is_some() {
                tx.execute(
                    "INSERT INTO rotation_lock (id, holder, acquired_at) VALUES (1, ?1, ?2)
                     ON CONFLICT (id) DO UPDATE SET
                         holder = excluded.holder,
                         acquired_at = excluded.acquired_at",
                    params![holder, now],
                )?;
            }
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(map_tr_err)?;

    match outcome {
        Some(Some(stale_holder)) => {
            warn!(stale_holder = %stale_holder, "took over expired rotation lock");
            Ok(true)
        }
        Some(None) => Ok(true),
        None => Ok(false),
    }
}

/// Release the lease if `holder` still owns it.
pub async fn release(db: &Database, holder: &str) -> Result<(), EnvaultError> {
    let holder = holder.to_string();
    db.connection()
        .call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "DELETE FROM rotation_lock WHERE id = 1 AND holder = ?1",
                params![holder],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lock.db");
        let db = Database::open(path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn second_holder_is_refused_until_release() {
        let (db, _dir) = setup().await;
        assert!(try_acquire(&db, "run-a", 900).await.unwrap());
        assert!(!try_acquire(&db, "run-b", 900).await.unwrap());

        // Releasing someone else's lease does nothing.
        release(&db, "run-b").await.unwrap();
        assert!(!try_acquire(&db, "run-b", 900).await.unwrap());

        release(&db, "run-a").await.unwrap();
        assert!(try_acquire(&db, "run-b", 900).await.unwrap());
    }

    #[tokio::test]
    async fn holder_can_reacquire() {
        let (db, _dir) = setup().await;
        assert!(try_acquire(&db, "run-a", 900).await.unwrap());
        assert!(try_acquire(&db, "run-a", 900).await.unwrap());
    }

    #[tokio::test]
    async fn expired_lease_is_taken_over() {
        let (db, _dir) = setup().await;
        assert!(try_acquire_at(&db, "crashed", 60, 1_000).await.unwrap());
        assert!(!try_acquire_at(&db, "fresh", 60, 1_059).await.unwrap());
        assert!(try_acquire_at(&db, "fresh", 60, 1_060).await.unwrap());

        // The crashed run no longer owns it.
        release(&db, "crashed").await.unwrap();
        assert!(!try_acquire_at(&db, "other", 60, 1_070).await.unwrap());
    }

    #[tokio::test]
    async fn renewal_extends_the_lease() {
        let (db, _dir) = setup().await;
        assert!(try_acquire_at(&db, "run-a", 60, 1_000).await.unwrap());
        assert!(try_acquire_at(&db, "run-a", 60, 1_050).await.unwrap());
        // Expired against the first acquisition, still live after renewal.
        assert!(!try_acquire_at(&db, "run-b", 60, 1_070).await.unwrap());
        assert!(try_acquire_at(&db, "run-b", 60, 1_110).await.unwrap());
        assert!(!try_acquire_at(&db, "run-a", 60, 1_111).await.unwrap());
    }
}
