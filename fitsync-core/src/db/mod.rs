//! Database layer for fitsync
//!
//! This module provides the storage layer using SQLite with:
//! - Schema migrations
//! - Batch insert-or-replace inside a single transaction
//! - Read helpers for the normalized tables

pub mod repo;
pub mod schema;

pub use repo::Database;
