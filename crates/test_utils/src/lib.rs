//! Test Utilities Crate
//!
//! Provides shared test infrastructure, fixtures, and builders for the
//! billing workspace test suites.
//!
//! # Modules
//!
//! - `fixtures`: Pre-built test data (dates, money, identifiers, snapshots)
//! - `builders`: Builder patterns for entries, broker invoices and manifests
//! - `assertions`: Custom assertion helpers for money
//! - `generators`: Property-based test data generators
//!
//! This crate depends only on `core_kernel` and `domain_customs` so that
//! any domain crate can use it as a dev-dependency.

pub mod fixtures;
pub mod builders;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use assertions::*;
pub use generators::*;
