//! Applies a [`Diff`] to the store.
//!
//! The strategy comes from configuration. `AtomicCombined` sends one
//! combined update and inherits whatever atomicity the store gives it.
//! `TwoPhase` retracts first, then asserts; if the assertion fails after the
//! retraction succeeded, the retracted statements are re-asserted once and
//! the original failure is reported as a [`PartialApplyError`].

use serde::Serialize;

use rdfsync_core::{Diff, StatementSet};
use rdfsync_storage::{ConnectionPool, TripleStore};

use crate::config::ApplyStrategy;
use crate::error::{EngineError, PartialApplyError, RollbackOutcome};

/// What an apply did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ApplyOutcome {
    pub strategy: ApplyStrategy,
    pub retracted: usize,
    pub asserted: usize,
    /// False when the diff was empty and the store was not contacted.
    pub touched_store: bool,
}

/// Sends diffs through a pool using a fixed strategy.
pub struct Executor<'a, S: TripleStore + ?Sized> {
    pool: &'a ConnectionPool<S>,
    strategy: ApplyStrategy,
}

impl<'a, S: TripleStore + ?Sized> Executor<'a, S> {
    pub fn new(pool: &'a ConnectionPool<S>, strategy: ApplyStrategy) -> Self {
        Executor { pool, strategy }
    }

    /// Applies `diff`. An empty diff never reaches the store.
    ///
    /// On success every retracted statement is absent and every asserted
    /// statement is present.
    pub async fn apply(&self, diff: &Diff) -> Result<ApplyOutcome, EngineError> {
        let retract = diff.retractions();
        let assert = diff.assertions();
        let mut outcome = ApplyOutcome {
            strategy: self.strategy,
            retracted: retract.len(),
            asserted: assert.len(),
            touched_store: false,
        };
        if retract.is_empty() && assert.is_empty() {
            tracing::debug!("empty diff; nothing to apply");
            return Ok(outcome);
        }

        tracing::info!(
            strategy = %self.strategy,
            retract = retract.len(),
            assert = assert.len(),
            "applying diff"
        );
        match self.strategy {
            ApplyStrategy::AtomicCombined => self.apply_combined(&retract, &assert).await?,
            ApplyStrategy::TwoPhase => self.apply_two_phase(retract, assert).await?,
        }
        outcome.touched_store = true;
        Ok(outcome)
    }

    async fn apply_combined(
        &self,
        retract: &StatementSet,
        assert: &StatementSet,
    ) -> Result<(), EngineError> {
        let conn = self.pool.acquire().await?;
        conn.update(retract, assert).await?;
        Ok(())
    }

    async fn apply_two_phase(
        &self,
        retract: StatementSet,
        assert: StatementSet,
    ) -> Result<(), EngineError> {
        let conn = self.pool.acquire().await?;

        if !retract.is_empty() {
            // Nothing was changed if the first phase fails.
            conn.delete(&retract).await?;
        }
        if assert.is_empty() {
            return Ok(());
        }

        let cause = match conn.insert(&assert).await {
            Ok(()) => return Ok(()),
            Err(cause) => cause,
        };
        if retract.is_empty() {
            return Err(cause.into());
        }

        tracing::warn!(
            error = %cause,
            retracted = retract.len(),
            "assertion failed after retraction; rolling back"
        );
        let rollback = match conn.insert(&retract).await {
            Ok(()) => {
                tracing::warn!(restored = retract.len(), "rollback restored retracted statements");
                RollbackOutcome::Restored
            }
            Err(err) => {
                tracing::error!(
                    error = %err,
                    lost = retract.len(),
                    "rollback failed; store needs manual reconciliation"
                );
                RollbackOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        };
        Err(PartialApplyError {
            retracted: retract,
            unconfirmed: assert,
            cause,
            rollback,
        }
        .into())
    }
}
