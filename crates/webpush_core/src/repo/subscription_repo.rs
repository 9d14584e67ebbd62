//! Subscription repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Replace an endpoint's full topic set atomically.
//! - Look up subscribers of a topic.
//! - Remove subscriptions by endpoint or owner.
//!
//! # Invariants
//! - Upsert deletes every row of the endpoint and reinserts the desired set in
//!   one transaction; topics left out are unsubscribed.
//! - Upserted rows start `warning_sent = 0` with a fresh `updated_at`.
//! - Removal ignores lifecycle state and succeeds when nothing matches.

use crate::clock::Clock;
use crate::db::DbError;
use crate::logging::redact_endpoint;
use crate::model::subscription::{
    normalize_user_id, NewSubscription, Subscription, SubscriptionValidationError,
};
use log::{debug, info};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};

const SUBSCRIPTION_SELECT_SQL: &str = "SELECT
    id,
    topic,
    user_id,
    endpoint,
    key_auth,
    key_p256dh,
    updated_at,
    warning_sent
FROM subscriptions";

pub type RepoResult<T> = Result<T, RepoError>;

/// Error for subscription persistence and lifecycle operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(SubscriptionValidationError),
    Db(DbError),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => {
                write!(f, "invalid persisted subscription data: {message}")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<SubscriptionValidationError> for RepoError {
    fn from(value: SubscriptionValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for subscription rows.
pub trait SubscriptionRepository {
    /// Replaces the endpoint's topic set; returns the number of rows inserted.
    fn upsert_subscription(&self, subscription: &NewSubscription) -> RepoResult<usize>;
    /// Returns every subscription of `topic`, in no particular order.
    fn subscriptions_for_topic(&self, topic: &str) -> RepoResult<Vec<Subscription>>;
    /// Deletes all rows of `endpoint`; returns the number of rows deleted.
    fn remove_subscriptions_by_endpoint(&self, endpoint: &str) -> RepoResult<usize>;
    /// Deletes all rows owned by `user_id`; returns the number of rows deleted.
    ///
    /// Blank owner ids are stored as NULL, so a blank `user_id` matches
    /// nothing and returns 0. Anonymous rows are removed by endpoint only.
    fn remove_subscriptions_by_user_id(&self, user_id: &str) -> RepoResult<usize>;
}

/// SQLite-backed subscription repository.
pub struct SqliteSubscriptionRepository<'conn> {
    conn: &'conn Connection,
    clock: &'conn dyn Clock,
}

impl<'conn> SqliteSubscriptionRepository<'conn> {
    /// Wraps a connection whose schema has already been initialized.
    pub fn new(conn: &'conn Connection, clock: &'conn dyn Clock) -> Self {
        Self { conn, clock }
    }
}

impl SubscriptionRepository for SqliteSubscriptionRepository<'_> {
    fn upsert_subscription(&self, subscription: &NewSubscription) -> RepoResult<usize> {
        let now_ms = self.clock.now_ms();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let replaced = tx.execute(
            "DELETE FROM subscriptions WHERE endpoint = ?1;",
            [subscription.endpoint.as_str()],
        )?;

        {
            let mut insert = tx.prepare(
                "INSERT INTO subscriptions (
                    topic,
                    user_id,
                    endpoint,
                    key_auth,
                    key_p256dh,
                    updated_at,
                    warning_sent
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0);",
            )?;
            for topic in &subscription.topics {
                insert.execute(params![
                    topic.as_str(),
                    subscription.user_id.as_deref(),
                    subscription.endpoint.as_str(),
                    subscription.key_auth.as_str(),
                    subscription.key_p256dh.as_str(),
                    now_ms,
                ])?;
            }
        }

        tx.commit()?;

        info!(
            "event=subscription_upsert module=repo status=ok endpoint={} replaced_rows={} topics={}",
            redact_endpoint(&subscription.endpoint),
            replaced,
            subscription.topics.len()
        );
        Ok(subscription.topics.len())
    }

    fn subscriptions_for_topic(&self, topic: &str) -> RepoResult<Vec<Subscription>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SUBSCRIPTION_SELECT_SQL} WHERE topic = ?1;"))?;
        let mut rows = stmt.query([topic])?;
        let mut subscriptions = Vec::new();

        while let Some(row) = rows.next()? {
            subscriptions.push(parse_subscription_row(row)?);
        }

        debug!(
            "event=subscription_lookup module=repo status=ok matches={}",
            subscriptions.len()
        );
        Ok(subscriptions)
    }

    fn remove_subscriptions_by_endpoint(&self, endpoint: &str) -> RepoResult<usize> {
        let removed = self.conn.execute(
            "DELETE FROM subscriptions WHERE endpoint = ?1;",
            [endpoint],
        )?;

        info!(
            "event=subscription_remove module=repo status=ok by=endpoint endpoint={} removed_rows={}",
            redact_endpoint(endpoint),
            removed
        );
        Ok(removed)
    }

    fn remove_subscriptions_by_user_id(&self, user_id: &str) -> RepoResult<usize> {
        // Anonymous rows store NULL and must never match a blank owner id.
        let Some(user_id) = normalize_user_id(Some(user_id)) else {
            return Ok(0);
        };

        let removed = self.conn.execute(
            "DELETE FROM subscriptions WHERE user_id = ?1;",
            [user_id.as_str()],
        )?;

        info!(
            "event=subscription_remove module=repo status=ok by=user_id removed_rows={}",
            removed
        );
        Ok(removed)
    }
}

fn parse_subscription_row(row: &Row<'_>) -> RepoResult<Subscription> {
    let warning_sent = match row.get::<_, i64>("warning_sent")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid warning_sent value `{other}` in subscriptions.warning_sent"
            )));
        }
    };

    Ok(Subscription {
        id: row.get("id")?,
        topic: row.get("topic")?,
        user_id: row.get("user_id")?,
        endpoint: row.get("endpoint")?,
        key_auth: row.get("key_auth")?,
        key_p256dh: row.get("key_p256dh")?,
        updated_at: row.get("updated_at")?,
        warning_sent,
    })
}
