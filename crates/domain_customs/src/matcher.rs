//! Manifest line matching
//!
//! Resolves a customs invoice line (container, PO, part, quantity) to the
//! single manifest line that shipped it.
//!
//! # Algorithm
//!
//! 1. Pool: lines of the named container, or every line when no container
//!    is given.
//! 2. Lines already consumed in this run are excluded.
//! 3. Product and order identifiers must equal the importer-namespaced
//!    part and PO.
//! 4. When nothing is left, consumed lines carrying the split-tariff
//!    sentinel are tried instead; they are the only reusable lines.
//!
//!    Consumed sentinel lines do not compete with unconsumed lines: an
//!    unconsumed line wins even when a consumed sentinel line has the
//!    closer quantity. A split-tariff line is billed by its first match,
//!    so a later invoice line only falls back to it when the manifest
//!    offers nothing else.
//! 5. For consolidated ocean shipments the recorded commercial invoice
//!    number must match too.
//! 6. Among several survivors the closest quantity wins; equal distances
//!    go to the first line seen (shipment, container, line order).
//!
//! The consumed-line set is passed in explicitly and belongs to exactly one
//! run over one matcher; it is never persisted.

use rust_decimal::Decimal;
use std::collections::HashSet;
use thiserror::Error;
use tracing::debug;

use crate::manifest::{namespaced, Container, ManifestLine, ManifestShipment};

/// Position of a manifest line within a matcher's shipment list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ManifestLineKey {
    pub shipment: usize,
    pub container: usize,
    pub line: usize,
}

/// Manifest lines consumed so far in one run
#[derive(Debug, Default, Clone)]
pub struct UsedManifestLines {
    used: HashSet<ManifestLineKey>,
}

impl UsedManifestLines {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &ManifestLineKey) -> bool {
        self.used.contains(key)
    }

    pub fn mark(&mut self, key: ManifestLineKey) {
        self.used.insert(key);
    }

    pub fn len(&self) -> usize {
        self.used.len()
    }

    pub fn is_empty(&self) -> bool {
        self.used.is_empty()
    }
}

/// What to look for
#[derive(Debug, Clone)]
pub struct MatchRequest<'r> {
    pub container_number: Option<&'r str>,
    pub po_number: &'r str,
    pub part_number: &'r str,
    pub quantity: Decimal,
    /// Only supplied for consolidated (LCL) ocean shipments
    pub invoice_number: Option<&'r str>,
}

/// A resolved manifest line together with its container and shipment
#[derive(Debug, Clone, Copy)]
pub struct MatchedLine<'a> {
    pub key: ManifestLineKey,
    pub shipment: &'a ManifestShipment,
    pub container: &'a Container,
    pub line: &'a ManifestLine,
}

/// No manifest line satisfies a request
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no manifest line found for PO {po_number}, part {part_number}")]
pub struct MatchNotFound {
    pub po_number: String,
    pub part_number: String,
    pub container_number: Option<String>,
    pub invoice_number: Option<String>,
}

impl MatchNotFound {
    fn from_request(request: &MatchRequest<'_>) -> Self {
        Self {
            po_number: request.po_number.to_string(),
            part_number: request.part_number.to_string(),
            container_number: request.container_number.map(String::from),
            invoice_number: request.invoice_number.map(String::from),
        }
    }
}

/// Matches invoice lines against a fixed list of manifest shipments
#[derive(Debug, Clone)]
pub struct ManifestMatcher<'a> {
    importer_code: &'a str,
    shipments: Vec<&'a ManifestShipment>,
}

impl<'a> ManifestMatcher<'a> {
    /// Creates a matcher over `shipments`; identifiers are namespaced with
    /// `importer_code` before comparison
    pub fn new(
        importer_code: &'a str,
        shipments: impl IntoIterator<Item = &'a ManifestShipment>,
    ) -> Self {
        Self {
            importer_code,
            shipments: shipments.into_iter().collect(),
        }
    }

    /// Shipments this matcher searches, in search order
    pub fn shipments(&self) -> &[&'a ManifestShipment] {
        &self.shipments
    }

    /// Finds the best manifest line for `request` and marks it used
    ///
    /// # Errors
    ///
    /// Returns [`MatchNotFound`] when no line qualifies. This is a business
    /// condition (manifest data often lags entry corrections), not a fault.
    pub fn find_line(
        &self,
        request: &MatchRequest<'_>,
        used: &mut UsedManifestLines,
    ) -> Result<MatchedLine<'a>, MatchNotFound> {
        let product_id = namespaced(self.importer_code, request.part_number);
        let order_number = namespaced(self.importer_code, request.po_number);

        let identity = |m: &MatchedLine<'a>| {
            m.line.product_id.trim() == product_id && m.line.order_number.trim() == order_number
        };

        let mut candidates: Vec<MatchedLine<'a>> = self
            .pool(request.container_number)
            .filter(|m| !used.contains(&m.key))
            .filter(|m| identity(m))
            .collect();

        if candidates.is_empty() {
            candidates = self
                .pool(request.container_number)
                .filter(|m| used.contains(&m.key) && m.line.is_split_tariff())
                .filter(|m| identity(m))
                .collect();
        }

        if let Some(invoice_number) = request.invoice_number {
            candidates.retain(|m| m.line.invoice_number.as_deref().map(str::trim) == Some(invoice_number.trim()));
        }

        let chosen = match candidates.len() {
            0 => None,
            1 => candidates.into_iter().next(),
            _ => candidates
                .into_iter()
                .min_by_key(|m| (m.line.quantity - request.quantity).abs()),
        };

        match chosen {
            Some(matched) => {
                debug!(
                    po = request.po_number,
                    part = request.part_number,
                    shipment = %matched.shipment.reference,
                    container = %matched.container.container_number,
                    line = matched.line.line_number,
                    "matched manifest line"
                );
                used.mark(matched.key);
                Ok(matched)
            }
            None => Err(MatchNotFound::from_request(request)),
        }
    }

    fn pool<'s>(&'s self, container_number: Option<&'s str>) -> impl Iterator<Item = MatchedLine<'a>> + 's {
        self.shipments
            .iter()
            .enumerate()
            .flat_map(move |(si, shipment)| {
                let shipment: &'a ManifestShipment = *shipment;
                shipment
                    .containers
                    .iter()
                    .enumerate()
                    .filter(move |(_, c)| {
                        container_number.map_or(true, |number| c.container_number.trim() == number.trim())
                    })
                    .flat_map(move |(ci, container)| {
                        container.lines.iter().enumerate().map(move |(li, line)| MatchedLine {
                            key: ManifestLineKey { shipment: si, container: ci, line: li },
                            shipment,
                            container,
                            line,
                        })
                    })
            })
    }
}
