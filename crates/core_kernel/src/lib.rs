//! Core Kernel - Foundational types shared by the claims assistant crates
//!
//! This crate provides the building blocks used across the workspace:
//! - Strongly-typed identifiers for claims, documents and wizard sessions
//! - Money types with precise decimal arithmetic for payout calculations
//! - Port infrastructure (errors, health checks) for storage adapters

pub mod money;
pub mod identifiers;
pub mod error;
pub mod ports;

pub use money::{Money, Currency, MoneyError, Rate};
pub use identifiers::{ClaimId, DocumentId, SessionId};
pub use error::CoreError;
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
};
