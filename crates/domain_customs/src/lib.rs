//! Customs Domain - Entry and Manifest Snapshots
//!
//! This crate models the read-only inputs of the billing engine and the
//! logic that reconciles them:
//!
//! - **Entries**: released customs entries with commercial invoice lines
//!   and their duty/fee sub-amounts
//! - **Broker invoices**: billing events (charge code + signed amount)
//! - **Manifests**: independently received ASNs with containers and
//!   shipped lines
//! - **Matching**: deterministic resolution of each invoice line to one
//!   manifest line
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_customs::{ManifestMatcher, UsedManifestLines, MatchRequest};
//!
//! let matcher = ManifestMatcher::new(&entry.importer_code, &shipments);
//! let mut used = UsedManifestLines::new();
//! let matched = matcher.find_line(&request, &mut used)?;
//! ```

pub mod entry;
pub mod broker_invoice;
pub mod manifest;
pub mod matcher;
pub mod validation;
pub mod snapshot;
pub mod error;

pub use entry::{CustomsEntry, CommercialInvoice, InvoiceLine, Tariff, TransportMode, LoadType};
pub use broker_invoice::{BrokerInvoice, ChargeLine, sort_chronologically};
pub use manifest::{ManifestShipment, Container, ManifestLine, SPLIT_TARIFF_SENTINEL, namespaced, shipments_for_entry};
pub use matcher::{ManifestMatcher, ManifestLineKey, MatchRequest, MatchedLine, MatchNotFound, UsedManifestLines};
pub use validation::{MatchFailure, LineResolution, resolve_entry_lines, validate_manifest_matches};
pub use snapshot::EntrySnapshot;
pub use error::CustomsError;
