//! Core Kernel - Foundational types shared by the billing workspace
//!
//! This crate provides the building blocks used across the domain crates:
//! - Money types with precise decimal arithmetic
//! - Strongly-typed identifiers
//! - Port error and marker traits for adapters

pub mod money;
pub mod identifiers;
pub mod ports;
pub mod error;

pub use money::{Money, Currency, MoneyError, Rate};
pub use identifiers::{BrokerInvoiceId, ShipmentId, SyncRecordId, DocumentId};
pub use ports::{PortError, DomainPort};
pub use error::CoreError;
