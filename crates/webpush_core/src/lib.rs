//! Persistent web push subscription store.
//! Owns subscription rows, their topic memberships and the expiry lifecycle.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod store;
pub mod sweep;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, StoreConfig, SweepConfig};
pub use db::{DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::subscription::{
    NewSubscription, PushTarget, Subscription, SubscriptionId, SubscriptionState,
    SubscriptionValidationError,
};
pub use repo::subscription_repo::{
    RepoError, RepoResult, SqliteSubscriptionRepository, SubscriptionRepository,
};
pub use store::Store;
pub use sweep::expiry::{ExpirySweeper, SweepOutcome};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
