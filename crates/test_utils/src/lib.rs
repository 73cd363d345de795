//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and helpers for the
//! claims assistant test suite.
//!
//! # Modules
//!
//! - `fixtures`: Sample document texts and fixed dates
//! - `builders`: Builders for claims and wizard sessions
//! - `database`: Claim store helpers, including an opt-in PostgreSQL store
//! - `assertions`: Custom assertion helpers for domain types
//! - `generators`: Property-based test data generators

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
