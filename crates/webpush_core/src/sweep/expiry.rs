//! Expiry sweep: the only multi-step lifecycle transition of the store.
//!
//! # Responsibility
//! - Delete warned subscriptions older than the expiry duration.
//! - Hand out subscriptions that just crossed the warning duration.
//! - Mark those subscriptions as warned.
//!
//! # Invariants
//! - All three steps run in one IMMEDIATE transaction, in this order:
//!   expire, select warnable, mark warned.
//! - A row is never both expired and returned by the same sweep.
//! - A row is returned by at most one sweep between two upserts.
//! - Age is `now - updated_at`; a row is due when age >= duration.

use crate::clock::{duration_to_ms, Clock};
use crate::model::subscription::PushTarget;
use crate::repo::subscription_repo::RepoResult;
use log::{info, warn};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::time::{Duration, Instant};

/// Result of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Rows deleted because they were warned and past the expiry duration.
    pub expired_rows: usize,
    /// Rows moved from active to warned.
    pub warned_rows: usize,
    /// Distinct push targets that need a "closing soon" notice.
    pub targets: Vec<PushTarget>,
}

/// Runs expiry sweeps against one connection.
pub struct ExpirySweeper<'conn> {
    conn: &'conn Connection,
    clock: &'conn dyn Clock,
}

impl<'conn> ExpirySweeper<'conn> {
    pub fn new(conn: &'conn Connection, clock: &'conn dyn Clock) -> Self {
        Self { conn, clock }
    }

    /// Expires stale warned rows and returns rows that need a warning.
    ///
    /// The caller keeps `warning < expiry`. A violating pair is not rejected:
    /// rows that are already past expiry when first observed are warned by
    /// this sweep and only deleted by a later one.
    ///
    /// # Errors
    /// Any storage error rolls back every step of the sweep.
    pub fn sweep(&self, warning: Duration, expiry: Duration) -> RepoResult<SweepOutcome> {
        let started_at = Instant::now();
        if warning >= expiry {
            warn!(
                "event=expiry_sweep module=sweep status=misconfigured warning_ms={} expiry_ms={}",
                warning.as_millis(),
                expiry.as_millis()
            );
        }

        let now_ms = self.clock.now_ms();
        let expire_before = now_ms.saturating_sub(duration_to_ms(expiry));
        let warn_before = now_ms.saturating_sub(duration_to_ms(warning));

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let expired_rows = tx.execute(
            "DELETE FROM subscriptions
             WHERE warning_sent = 1
               AND updated_at <= ?1;",
            [expire_before],
        )?;

        let mut targets = Vec::new();
        {
            let mut stmt = tx.prepare(
                "SELECT DISTINCT endpoint, key_auth, key_p256dh, user_id
                 FROM subscriptions
                 WHERE warning_sent = 0
                   AND updated_at <= ?1
                 ORDER BY endpoint;",
            )?;
            let mut rows = stmt.query([warn_before])?;
            while let Some(row) = rows.next()? {
                targets.push(PushTarget {
                    endpoint: row.get("endpoint")?,
                    key_auth: row.get("key_auth")?,
                    key_p256dh: row.get("key_p256dh")?,
                    user_id: row.get("user_id")?,
                });
            }
        }

        let warned_rows = tx.execute(
            "UPDATE subscriptions
             SET warning_sent = 1
             WHERE warning_sent = 0
               AND updated_at <= ?1;",
            [warn_before],
        )?;

        tx.commit()?;

        info!(
            "event=expiry_sweep module=sweep status=ok duration_ms={} expired_rows={} warned_rows={} targets={}",
            started_at.elapsed().as_millis(),
            expired_rows,
            warned_rows,
            targets.len()
        );

        Ok(SweepOutcome {
            expired_rows,
            warned_rows,
            targets,
        })
    }
}
