//! Subscription domain model.
//!
//! # Responsibility
//! - Define the persisted subscription row and its lifecycle state.
//! - Define the addressing tuple handed to notifiers.
//! - Normalize and validate upsert input.
//!
//! # Invariants
//! - Endpoint, topics and key material are never blank once validated.
//! - A blank owner id is normalized to `None`.
//! - Topic sets are deduplicated; ordering carries no meaning.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Surrogate row key assigned by storage.
pub type SubscriptionId = i64;

/// Lifecycle state of a stored subscription row.
///
/// Expired subscriptions have no state: their rows no longer exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionState {
    /// No expiry warning has been issued yet.
    Active,
    /// A "closing soon" warning was handed out by a sweep.
    Warned,
}

/// One topic membership of a push endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub topic: String,
    /// Opaque owner identifier, if the subscription belongs to an account.
    pub user_id: Option<String>,
    pub endpoint: String,
    pub key_auth: String,
    pub key_p256dh: String,
    /// Unix epoch milliseconds of creation or last replace.
    pub updated_at: i64,
    pub warning_sent: bool,
}

impl Subscription {
    pub fn state(&self) -> SubscriptionState {
        if self.warning_sent {
            SubscriptionState::Warned
        } else {
            SubscriptionState::Active
        }
    }

    /// Age of this row at `now_ms`, measured from `updated_at`.
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.updated_at)
    }

    /// Addressing information for delivering a push to this endpoint.
    pub fn push_target(&self) -> PushTarget {
        PushTarget {
            endpoint: self.endpoint.clone(),
            key_auth: self.key_auth.clone(),
            key_p256dh: self.key_p256dh.clone(),
            user_id: self.user_id.clone(),
        }
    }
}

/// Everything a notifier needs to address one push endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PushTarget {
    pub endpoint: String,
    pub key_auth: String,
    pub key_p256dh: String,
    pub user_id: Option<String>,
}

/// Validated input for replacing the full topic set of one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscription {
    pub endpoint: String,
    /// Desired topic set. Empty means "unsubscribe from everything".
    pub topics: BTreeSet<String>,
    pub user_id: Option<String>,
    pub key_auth: String,
    pub key_p256dh: String,
}

impl NewSubscription {
    /// Builds and validates an upsert request.
    ///
    /// # Errors
    /// - `EmptyEndpoint` when `endpoint` is blank.
    /// - `EmptyTopic` when any topic is blank.
    /// - `EmptyKeyMaterial` when either key is blank.
    pub fn new<S: AsRef<str>>(
        endpoint: &str,
        topics: &[S],
        user_id: Option<&str>,
        key_auth: &str,
        key_p256dh: &str,
    ) -> Result<Self, SubscriptionValidationError> {
        if endpoint.trim().is_empty() {
            return Err(SubscriptionValidationError::EmptyEndpoint);
        }
        if key_auth.trim().is_empty() {
            return Err(SubscriptionValidationError::EmptyKeyMaterial("key_auth"));
        }
        if key_p256dh.trim().is_empty() {
            return Err(SubscriptionValidationError::EmptyKeyMaterial("key_p256dh"));
        }

        let mut unique = BTreeSet::new();
        for topic in topics {
            let topic = topic.as_ref();
            if topic.trim().is_empty() {
                return Err(SubscriptionValidationError::EmptyTopic);
            }
            unique.insert(topic.to_string());
        }

        Ok(Self {
            endpoint: endpoint.to_string(),
            topics: unique,
            user_id: normalize_user_id(user_id),
            key_auth: key_auth.to_string(),
            key_p256dh: key_p256dh.to_string(),
        })
    }
}

/// Maps blank owner ids to `None`.
pub fn normalize_user_id(user_id: Option<&str>) -> Option<String> {
    user_id
        .filter(|value| !value.trim().is_empty())
        .map(str::to_string)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionValidationError {
    EmptyEndpoint,
    EmptyTopic,
    EmptyKeyMaterial(&'static str),
}

impl Display for SubscriptionValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyEndpoint => write!(f, "subscription endpoint cannot be empty"),
            Self::EmptyTopic => write!(f, "subscription topic cannot be empty"),
            Self::EmptyKeyMaterial(field) => write!(f, "subscription {field} cannot be empty"),
        }
    }
}

impl Error for SubscriptionValidationError {}
