//! Subscription lifecycle sweeps.
//!
//! # Invariants
//! - Expiry and warning transitions for all rows happen in one transaction.
//! - Expiry only targets rows that were already warned.

pub mod expiry;
