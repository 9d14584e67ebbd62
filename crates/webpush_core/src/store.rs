//! Subscription store facade.
//!
//! # Responsibility
//! - Own the SQLite connection and the clock for the lifetime of the store.
//! - Expose repository and sweep operations as one public surface.
//!
//! # Invariants
//! - A `Store` only exists once schema initialization has succeeded.
//! - Returned subscriptions are owned copies.

use crate::clock::{Clock, SystemClock};
use crate::config::{StoreConfig, SweepConfig};
use crate::db::{open_db, open_db_in_memory, DbError, DbResult};
use crate::model::subscription::{NewSubscription, PushTarget, Subscription};
use crate::repo::subscription_repo::{
    RepoResult, SqliteSubscriptionRepository, SubscriptionRepository,
};
use crate::sweep::expiry::{ExpirySweeper, SweepOutcome};
use log::info;
use rusqlite::Connection;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Persistent web push subscription store.
pub struct Store {
    conn: Connection,
    clock: Arc<dyn Clock>,
}

impl Store {
    /// Opens (creating if absent) the store at `path` using wall-clock time.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Self::open_with_clock(path, Arc::new(SystemClock))
    }

    pub fn open_with_clock(path: impl AsRef<Path>, clock: Arc<dyn Clock>) -> DbResult<Self> {
        Ok(Self {
            conn: open_db(path)?,
            clock,
        })
    }

    pub fn open_in_memory() -> DbResult<Self> {
        Self::open_in_memory_with_clock(Arc::new(SystemClock))
    }

    pub fn open_in_memory_with_clock(clock: Arc<dyn Clock>) -> DbResult<Self> {
        Ok(Self {
            conn: open_db_in_memory()?,
            clock,
        })
    }

    /// Opens the store described by `config`.
    ///
    /// Configuration is validated by the caller; only the path is used here.
    pub fn from_config(config: &StoreConfig) -> DbResult<Self> {
        Self::open(&config.db_path)
    }

    /// Replaces the full topic set of `endpoint`.
    ///
    /// An empty `topics` slice unsubscribes the endpoint from everything.
    /// Re-subscribing resets the age and warning state of every row.
    pub fn upsert_subscription<S: AsRef<str>>(
        &self,
        endpoint: &str,
        topics: &[S],
        user_id: Option<&str>,
        key_auth: &str,
        key_p256dh: &str,
    ) -> RepoResult<()> {
        let subscription = NewSubscription::new(endpoint, topics, user_id, key_auth, key_p256dh)?;
        self.repository().upsert_subscription(&subscription)?;
        Ok(())
    }

    pub fn subscriptions_for_topic(&self, topic: &str) -> RepoResult<Vec<Subscription>> {
        self.repository().subscriptions_for_topic(topic)
    }

    /// Deletes every subscription of `endpoint`; returns the deleted row count.
    pub fn remove_subscriptions_by_endpoint(&self, endpoint: &str) -> RepoResult<usize> {
        self.repository().remove_subscriptions_by_endpoint(endpoint)
    }

    /// Deletes every subscription owned by `user_id`; returns the deleted row count.
    ///
    /// A blank `user_id` deletes nothing: anonymous subscriptions carry no
    /// owner and can only be removed through their endpoint.
    pub fn remove_subscriptions_by_user_id(&self, user_id: &str) -> RepoResult<usize> {
        self.repository().remove_subscriptions_by_user_id(user_id)
    }

    /// Expires warned subscriptions older than `expiry` and returns the push
    /// targets whose subscriptions just became older than `warning`.
    pub fn expire_and_get_expiring_subscriptions(
        &self,
        warning: Duration,
        expiry: Duration,
    ) -> RepoResult<Vec<PushTarget>> {
        Ok(self.sweep(warning, expiry)?.targets)
    }

    /// Same as [`Store::expire_and_get_expiring_subscriptions`], keeping row counts.
    pub fn sweep(&self, warning: Duration, expiry: Duration) -> RepoResult<SweepOutcome> {
        ExpirySweeper::new(&self.conn, self.clock.as_ref()).sweep(warning, expiry)
    }

    pub fn sweep_with_config(&self, config: &SweepConfig) -> RepoResult<SweepOutcome> {
        self.sweep(config.warning_duration(), config.expiry_duration())
    }

    /// Closes the underlying connection, reporting any close failure.
    pub fn close(self) -> DbResult<()> {
        self.conn
            .close()
            .map_err(|(_, err)| DbError::Sqlite(err))?;
        info!("event=db_close module=store status=ok");
        Ok(())
    }

    fn repository(&self) -> SqliteSubscriptionRepository<'_> {
        SqliteSubscriptionRepository::new(&self.conn, self.clock.as_ref())
    }
}
