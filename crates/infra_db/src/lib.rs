//! Infrastructure Database Layer
//!
//! Storage adapters implementing the `domain_claims::ClaimStore` port.
//!
//! - [`InMemoryClaimStore`]: the default, process-local backend
//! - [`PostgresClaimStore`]: claims as JSONB documents in PostgreSQL via SQLx
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{DatabaseConfig, create_pool, run_migrations, PostgresClaimStore};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/claim_assistant")).await?;
//! run_migrations(&pool).await?;
//! let store = PostgresClaimStore::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod memory;
pub mod postgres;

pub use pool::{DatabasePool, DatabaseConfig, create_pool, run_migrations};
pub use error::DatabaseError;
pub use memory::InMemoryClaimStore;
pub use postgres::PostgresClaimStore;
