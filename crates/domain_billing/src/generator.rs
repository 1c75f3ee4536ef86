//! Billing run orchestration
//!
//! A run processes every broker invoice of one entry in chronological
//! order and, for each, the DUTY then CONTAINER category:
//!
//! 1. Skip when the ledger already shows the category as sent.
//! 2. A credit that mirrors an earlier invoice replays that invoice's sent
//!    document as decrements.
//! 3. Otherwise build a fresh document; nothing to bill leaves the ledger
//!    untouched.
//! 4. Render, archive, deliver, then mark the ledger.
//!
//! Any failure is written to the ledger and the run moves on to the next
//! category. Proration reconciliation defects are written and then raised.
//!
//! The entry lock comes from the ledger, so generators in other tasks or
//! processes sharing the ledger wait for the run to finish. Each document
//! gets a creation stamp at least one millisecond after the previous one
//! from the same generator; file names built from it never repeat.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, instrument, warn};

use core_kernel::BrokerInvoiceId;
use domain_customs::{BrokerInvoice, EntrySnapshot};

use crate::builder::InvoiceDocumentBuilder;
use crate::config::BillingConfig;
use crate::document::{DocumentCategory, GenericInvoiceDocument};
use crate::error::BillingError;
use crate::ports::{DocumentArchivePort, OutboundTransport, SyncLedgerPort};
use crate::reversal::reversal_candidates;
use crate::sync::{DocumentRef, SyncKey, SyncRecord};
use crate::xml;

/// What happened to one category of one invoice
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// A document was delivered
    Sent {
        file_name: String,
        /// The invoice whose document was replayed, for reversals
        reversal_of: Option<BrokerInvoiceId>,
    },
    /// Sent in an earlier run
    AlreadySent,
    /// No charges for this category
    NothingToSend,
    /// Recorded on the ledger; retried next run
    Failed { message: String },
}

/// Outcome for one (invoice, category)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryOutcome {
    pub broker_invoice_id: BrokerInvoiceId,
    pub invoice_number: String,
    pub category: DocumentCategory,
    pub status: OutcomeStatus,
}

/// Summary of one billing run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BillingRunReport {
    pub entry_number: String,
    pub outcomes: Vec<CategoryOutcome>,
}

impl BillingRunReport {
    pub fn new(entry_number: impl Into<String>) -> Self {
        Self {
            entry_number: entry_number.into(),
            outcomes: Vec::new(),
        }
    }

    pub fn sent_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, OutcomeStatus::Sent { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, OutcomeStatus::Failed { .. }))
            .count()
    }

    /// File names delivered in this run
    pub fn sent_files(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.status {
                OutcomeStatus::Sent { file_name, .. } => Some(file_name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Outcome for one invoice and category
    pub fn outcome(&self, broker_invoice_id: BrokerInvoiceId, category: DocumentCategory) -> Option<&OutcomeStatus> {
        self.outcomes
            .iter()
            .find(|o| o.broker_invoice_id == broker_invoice_id && o.category == category)
            .map(|o| &o.status)
    }
}

/// Generates and delivers outbound billing documents
pub struct BillingGenerator {
    config: BillingConfig,
    ledger: Arc<dyn SyncLedgerPort>,
    archive: Arc<dyn DocumentArchivePort>,
    transport: Arc<dyn OutboundTransport>,
    clock: StampClock,
}

impl BillingGenerator {
    pub fn new(
        config: BillingConfig,
        ledger: Arc<dyn SyncLedgerPort>,
        archive: Arc<dyn DocumentArchivePort>,
        transport: Arc<dyn OutboundTransport>,
    ) -> Self {
        Self {
            config,
            ledger,
            archive,
            transport,
            clock: StampClock::default(),
        }
    }

    pub fn config(&self) -> &BillingConfig {
        &self.config
    }

    /// Runs billing for one entry
    ///
    /// # Errors
    ///
    /// Returns an error for an inconsistent snapshot or a reconciliation
    /// defect. Ordinary category failures are reported in the run report.
    #[instrument(skip_all, fields(entry_number = %snapshot.entry.entry_number))]
    pub async fn run(&self, snapshot: &EntrySnapshot) -> Result<BillingRunReport, BillingError> {
        snapshot.validate()?;
        let lease = self.ledger.lock_entry(&snapshot.entry.entry_number).await?;

        let builder = InvoiceDocumentBuilder::new(&self.config, snapshot);
        let invoices = snapshot.invoices_chronological();
        let mut report = BillingRunReport::new(snapshot.entry.entry_number.clone());

        for invoice in invoices.iter().copied() {
            for category in DocumentCategory::ALL {
                let status = match self.process(&builder, &invoices, invoice, category).await {
                    Ok(status) => status,
                    Err(err) => {
                        self.record_failure(invoice, category, &err).await;
                        if err.is_defect() {
                            error!(
                                invoice_number = %invoice.invoice_number,
                                %category,
                                error = %err,
                                "billing defect; aborting run"
                            );
                            return Err(err);
                        }
                        warn!(
                            invoice_number = %invoice.invoice_number,
                            %category,
                            error = %err,
                            "billing category failed"
                        );
                        OutcomeStatus::Failed {
                            message: err.ledger_message(),
                        }
                    }
                };

                report.outcomes.push(CategoryOutcome {
                    broker_invoice_id: invoice.id,
                    invoice_number: invoice.invoice_number.clone(),
                    category,
                    status,
                });
            }
        }

        if let Err(err) = lease.release().await {
            warn!(error = %err, "entry lock release failed");
        }

        info!(
            invoices = invoices.len(),
            sent = report.sent_count(),
            failed = report.failed_count(),
            "billing run finished"
        );
        Ok(report)
    }

    async fn process(
        &self,
        builder: &InvoiceDocumentBuilder<'_>,
        invoices: &[&BrokerInvoice],
        invoice: &BrokerInvoice,
        category: DocumentCategory,
    ) -> Result<OutcomeStatus, BillingError> {
        let key = category.sync_key();
        let existing = self.ledger.find(invoice.id, key).await?;
        if existing.as_ref().is_some_and(SyncRecord::is_sent) {
            debug!(invoice_number = %invoice.invoice_number, %category, "already sent");
            return Ok(OutcomeStatus::AlreadySent);
        }

        let now = self.clock.next();

        if let Some((original, document)) = self.find_reversal_source(invoices, invoice, category).await? {
            let reversal = document.reversal_for(invoice, now);
            let sent = self.send(&reversal).await?;

            self.mark_sent(existing, invoice.id, key, sent.clone()).await?;
            let reversal_key = category.reversal_key();
            let original_record = self.ledger.find(original.id, reversal_key).await?;
            self.mark_sent(original_record, original.id, reversal_key, sent.clone()).await?;

            info!(
                invoice_number = %invoice.invoice_number,
                reverses = %original.invoice_number,
                %category,
                file_name = %sent.file_name,
                "reversal document sent"
            );
            return Ok(OutcomeStatus::Sent {
                file_name: sent.file_name,
                reversal_of: Some(original.id),
            });
        }

        let document = match builder.build(category, invoice, now)? {
            Some(document) => document,
            None => {
                debug!(invoice_number = %invoice.invoice_number, %category, "nothing to send");
                return Ok(OutcomeStatus::NothingToSend);
            }
        };

        let sent = self.send(&document).await?;
        self.mark_sent(existing, invoice.id, key, sent.clone()).await?;

        info!(
            invoice_number = %invoice.invoice_number,
            %category,
            file_name = %sent.file_name,
            line_items = document.line_item_count(),
            "billing document sent"
        );
        Ok(OutcomeStatus::Sent {
            file_name: sent.file_name,
            reversal_of: None,
        })
    }

    /// First earlier invoice mirrored by `credit` that has not been
    /// reversed for `category`, with its archived document
    ///
    /// Falls back to normal generation (`None`) when that invoice has no
    /// retrievable document for the category.
    async fn find_reversal_source<'i>(
        &self,
        invoices: &[&'i BrokerInvoice],
        credit: &BrokerInvoice,
        category: DocumentCategory,
    ) -> Result<Option<(&'i BrokerInvoice, GenericInvoiceDocument)>, BillingError> {
        for candidate in reversal_candidates(credit, invoices) {
            let reversed = self.ledger.find(candidate.id, category.reversal_key()).await?;
            if reversed.as_ref().is_some_and(SyncRecord::is_sent) {
                continue;
            }

            let sent = self.ledger.find(candidate.id, category.sync_key()).await?;
            let document_ref = match sent.filter(SyncRecord::is_sent).and_then(|r| r.document) {
                Some(document_ref) => document_ref,
                None => {
                    debug!(
                        reverses = %candidate.invoice_number,
                        %category,
                        "reversal source has no sent document"
                    );
                    return Ok(None);
                }
            };

            return match self.archive.fetch(document_ref.document_id).await {
                Ok(Some(document)) => Ok(Some((candidate, document))),
                Ok(None) => {
                    warn!(
                        reverses = %candidate.invoice_number,
                        document = %document_ref.file_name,
                        "archived document missing; generating credit normally"
                    );
                    Ok(None)
                }
                Err(err) => {
                    warn!(
                        reverses = %candidate.invoice_number,
                        document = %document_ref.file_name,
                        error = %err,
                        "archived document unavailable; generating credit normally"
                    );
                    Ok(None)
                }
            };
        }
        Ok(None)
    }

    /// Renders, archives and delivers a document
    async fn send(&self, document: &GenericInvoiceDocument) -> Result<DocumentRef, BillingError> {
        let payload = xml::render(document)?;
        let document_ref = self.archive.store(document).await?;
        self.transport.deliver(document.file_name(), &payload).await?;
        Ok(document_ref)
    }

    async fn mark_sent(
        &self,
        existing: Option<SyncRecord>,
        broker_invoice_id: BrokerInvoiceId,
        key: SyncKey,
        document: DocumentRef,
    ) -> Result<(), BillingError> {
        let mut record = existing.unwrap_or_else(|| SyncRecord::new(broker_invoice_id, key));
        record.mark_sent(document, Utc::now());
        self.ledger.save(&record).await?;
        Ok(())
    }

    async fn record_failure(&self, invoice: &BrokerInvoice, category: DocumentCategory, err: &BillingError) {
        let key = category.sync_key();
        let existing = match self.ledger.find(invoice.id, key).await {
            Ok(existing) => existing,
            Err(ledger_err) => {
                error!(
                    invoice_number = %invoice.invoice_number,
                    %category,
                    error = %ledger_err,
                    "could not read ledger to record failure"
                );
                return;
            }
        };

        let mut record = existing.unwrap_or_else(|| SyncRecord::new(invoice.id, key));
        record.mark_failed(err.ledger_message(), Utc::now());
        if let Err(ledger_err) = self.ledger.save(&record).await {
            error!(
                invoice_number = %invoice.invoice_number,
                %category,
                error = %ledger_err,
                "could not record failure on ledger"
            );
        }
    }
}

/// Hands out strictly increasing millisecond stamps
#[derive(Debug, Default)]
struct StampClock {
    last: Mutex<Option<DateTime<Utc>>>,
}

impl StampClock {
    fn next(&self) -> DateTime<Utc> {
        self.next_after(Utc::now())
    }

    fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let now = now.trunc_subsecs(3);
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let stamp = match *last {
            Some(previous) if now <= previous => previous + Duration::milliseconds(1),
            _ => now,
        };
        *last = Some(stamp);
        stamp
    }
}
