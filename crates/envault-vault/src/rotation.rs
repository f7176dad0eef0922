// SPDX-FileCopyrightText: 2026 Envault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Online data-key rotation.
//!
//! One run creates a data key (or resumes the `migrating` key left by a failed
//! run), re-encrypts every secret not yet on it, and only then retires the old
//! active key and promotes the new one. The sweep is not one transaction: the
//! store is observably mixed while it runs. Old keys are never deleted, so
//! records the sweep has not reached stay readable throughout.
//!
//! Any per-record failure aborts the run before promotion. Records already
//! migrated keep their new values and the new key stays `migrating`; running
//! rotation again resumes with that key and skips them. The same holds when
//! concurrent writes keep records off the new key past the last sweep pass.
//!
//! Each record is re-encrypted with a compare-and-swap against the value it
//! was read with. A record rewritten in between is left alone and picked up
//! by the next pass. The lock lease is renewed before every record and before
//! promotion; a run that finds the lease taken stops without promoting.

use std::sync::Arc;

use envault_config::model::RotationConfig;
use envault_core::{EnvaultError, RotationLock, SecretFilter, SecretRecord, SecretStore};
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::codec::SecretCiphertext;
use crate::record::RecordCipher;
use crate::registry::DataKeyBytes;

/// States of one rotation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationPhase {
    Start,
    KeyCreated,
    Migrating,
    Promoted,
    Retiring,
    Done,
    Failed,
}

impl RotationPhase {
    /// Whether `self -> next` is a legal transition.
    pub fn can_advance_to(self, next: RotationPhase) -> bool {
        use RotationPhase::*;
        matches!(
            (self, next),
            (Start, KeyCreated)
                | (KeyCreated, Migrating)
                | (Migrating, Promoted)
                | (Migrating, Failed)
                | (Promoted, Retiring)
                | (Retiring, Done)
        )
    }
}

impl std::fmt::Display for RotationPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RotationPhase::Start => "start",
            RotationPhase::KeyCreated => "key_created",
            RotationPhase::Migrating => "migrating",
            RotationPhase::Promoted => "promoted",
            RotationPhase::Retiring => "retiring",
            RotationPhase::Done => "done",
            RotationPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RotationReport {
    pub success: bool,
    /// Records re-encrypted by this run.
    pub migrated_count: usize,
    pub new_key_id: String,
    /// Records already on the new key when the run started.
    pub skipped_count: usize,
    pub retired_key_ids: Vec<String>,
    /// True when the run picked up a key left `migrating` by an earlier run.
    pub resumed: bool,
}

/// Tracks the phase of one run and rejects illegal transitions.
struct RotationRun {
    phase: RotationPhase,
}

impl RotationRun {
    fn new() -> Self {
        Self {
            phase: RotationPhase::Start,
        }
    }

    fn advance(&mut self, next: RotationPhase) -> Result<(), EnvaultError> {
        if !self.phase.can_advance_to(next) {
            return Err(EnvaultError::Internal(format!(
                "illegal rotation transition {} -> {next}",
                self.phase
            )));
        }
        debug!(from = %self.phase, to = %next, "rotation phase");
        self.phase = next;
        Ok(())
    }
}

pub struct RotationOrchestrator {
    secrets: Arc<dyn SecretStore>,
    lock: Arc<dyn RotationLock>,
    cipher: RecordCipher,
    config: RotationConfig,
    holder: String,
}

impl RotationOrchestrator {
    pub fn new(
        secrets: Arc<dyn SecretStore>,
        lock: Arc<dyn RotationLock>,
        cipher: RecordCipher,
        config: RotationConfig,
    ) -> Self {
        Self {
            secrets,
            lock,
            cipher,
            config,
            holder: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Run one rotation under the rotation lock.
    ///
    /// Fails with `RotationInProgress` if another live run holds the lock.
    pub async fn rotate(&self) -> Result<RotationReport, EnvaultError> {
        if !self
            .lock
            .try_acquire(&self.holder, self.config.lock_ttl_secs)
            .await?
        {
            warn!("rotation lock is held by another run");
            return Err(EnvaultError::RotationInProgress);
        }

        let result = self.rotate_locked().await;

        if let Err(e) = self.lock.release(&self.holder).await {
            warn!(error = %e, "failed to release rotation lock; it will expire");
        }
        result
    }

    async fn rotate_locked(&self) -> Result<RotationReport, EnvaultError> {
        let mut run = RotationRun::new();
        let registry = self.cipher.registry();

        let (new_key_id, resumed) = match registry.find_migrating().await? {
            Some(existing) => {
                info!(key_id = %existing.id, "resuming rotation with migrating key");
                (existing.id, true)
            }
            None => (registry.create_key().await?.id, false),
        };
        let new_key = registry.resolve_key(&new_key_id).await?;
        run.advance(RotationPhase::KeyCreated)?;

        run.advance(RotationPhase::Migrating)?;
        let mut skipped_count = 0;
        let mut pending: Vec<SecretRecord> = Vec::new();
        for record in self.secrets.list_secrets(&SecretFilter::default()).await? {
            if record.is_on_key(&new_key_id) {
                skipped_count += 1;
            } else {
                pending.push(record);
            }
        }

        let mut migrated_count = 0;
        let max_passes = self.config.max_sweep_passes.max(1);
        for pass in 1..=max_passes {
            if pending.is_empty() {
                break;
            }
            info!(pass, records = pending.len(), key_id = %new_key_id, "sweep pass");
            for record in &pending {
                self.renew_lease(&mut run).await?;
                match self.migrate_record(record, &new_key_id, &new_key).await {
                    Ok(true) => migrated_count += 1,
                    Ok(false) => {
                        debug!(record_id = %record.id, "secret changed during sweep; deferred to next pass");
                    }
                    Err(source) => {
                        error!(
                            record_id = %record.id,
                            key_id = %new_key_id,
                            migrated = migrated_count,
                            error = %source,
                            "secret migration failed; aborting rotation"
                        );
                        run.advance(RotationPhase::Failed)?;
                        return Err(EnvaultError::MigrationFailed {
                            record_id: record.id.clone(),
                            key_id: new_key_id,
                            migrated: migrated_count,
                            source: Box::new(source),
                        });
                    }
                }
            }
            pending = self.secrets.secrets_not_on_key(&new_key_id).await?;
        }
        if !pending.is_empty() {
            warn!(
                pending = pending.len(),
                key_id = %new_key_id,
                migrated = migrated_count,
                "records still not on the new key after the last sweep pass; not promoting"
            );
            run.advance(RotationPhase::Failed)?;
            return Err(EnvaultError::SweepIncomplete {
                key_id: new_key_id,
                pending: pending.len(),
                migrated: migrated_count,
            });
        }

        self.renew_lease(&mut run).await?;
        let retired_key_ids = registry.promote_exclusive(&new_key_id).await?;
        run.advance(RotationPhase::Promoted)?;
        run.advance(RotationPhase::Retiring)?;
        for key_id in &retired_key_ids {
            debug!(key_id = %key_id, "old key kept for reads");
        }
        run.advance(RotationPhase::Done)?;

        info!(
            key_id = %new_key_id,
            migrated = migrated_count,
            skipped = skipped_count,
            retired = retired_key_ids.len(),
            "key rotation complete"
        );
        Ok(RotationReport {
            success: true,
            migrated_count,
            new_key_id,
            skipped_count,
            retired_key_ids,
            resumed,
        })
    }

    /// Extend the lease. Fails with `RotationInProgress` once another holder
    /// owns it.
    async fn renew_lease(&self, run: &mut RotationRun) -> Result<(), EnvaultError> {
        if self
            .lock
            .try_acquire(&self.holder, self.config.lock_ttl_secs)
            .await?
        {
            return Ok(());
        }
        warn!("rotation lock was taken over by another run; stopping before promotion");
        run.advance(RotationPhase::Failed)?;
        Err(EnvaultError::RotationInProgress)
    }

    /// Re-encrypt one record. Returns `false` if it changed since it was read.
    async fn migrate_record(
        &self,
        record: &SecretRecord,
        new_key_id: &str,
        new_key: &DataKeyBytes,
    ) -> Result<bool, EnvaultError> {
        let plaintext = self.cipher.decrypt_secret_record(record).await?;
        let value = SecretCiphertext::wrap(new_key_id, &plaintext, new_key)?.to_record_value();
        let written = self
            .secrets
            .update_ciphertext(&record.id, &record.value, &value, new_key_id)
            .await?;
        if written {
            debug!(record_id = %record.id, key_id = %new_key_id, "migrated secret");
        }
        Ok(written)
    }
}
