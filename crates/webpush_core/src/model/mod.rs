//! Domain model for push subscriptions.
//!
//! # Responsibility
//! - Define the records exchanged between the store and its callers.
//! - Validate caller input before it reaches persistence.
//!
//! # Invariants
//! - Values returned to callers are owned copies with no link back to storage.
//! - `(topic, endpoint)` identifies at most one subscription row.

pub mod subscription;
