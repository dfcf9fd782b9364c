//! # fitsync-core
//!
//! Core library for fitsync - a fitness tracker archive normalizer.
//!
//! This library provides:
//! - Domain types for heart-rate, sleep and activity records
//! - Completeness checking of downloaded day folders
//! - Normalizers for every raw file family
//! - Database storage layer with SQLite
//! - Configuration management
//! - Logging infrastructure
//!
//! ## Architecture
//!
//! Data flows through two layers:
//! - **Layer 0 (Raw):** Day folders on disk, one per calendar day (immutable)
//! - **Layer 1 (Normalized):** Time-indexed SQLite tables, one per record kind
//!
//! ## Example
//!
//! ```rust,no_run
//! use fitsync_core::{Config, Database, IngestCoordinator};
//!
//! // Load configuration
//! let config = Config::load().expect("failed to load config");
//!
//! // Open database
//! let db = Database::open(&config.resolved_database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//!
//! // Normalize every pending day
//! let coordinator = IngestCoordinator::from_config(db, &config).expect("missing [archive]");
//! coordinator.sync_all().expect("sync failed");
//! ```

// Re-export commonly used items at the crate root
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use ingest::{IngestCoordinator, RecordSink, SyncResult};
pub use types::*;

// Public modules
pub mod archive;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod types;
