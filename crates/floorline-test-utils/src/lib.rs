//! Test utilities for Floorline crates:
//! - in-memory SQLite database setup with per-module migrations
//! - mock event transport for asserting published domain events
//! - helpers for unique test values

pub mod db;
pub mod events;
pub mod helpers;

pub use db::{setup_test_db, setup_test_db_with_migrations};
pub use events::{mock_transactional_event_bus, MockEventTransport};
pub use helpers::*;
