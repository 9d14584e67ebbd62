//! Repository layer for subscription persistence.
//!
//! # Responsibility
//! - Define the subscription data access contract.
//! - Keep SQLite statements out of the store facade and sweeper.
//!
//! # Invariants
//! - Write paths validate input before any SQL mutation.
//! - Multi-statement writes run in one transaction and roll back as a unit.

pub mod subscription_repo;
