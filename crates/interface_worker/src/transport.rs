//! Outbox directory transport
//!
//! Each document is written to a hidden partial file and then linked under
//! its final name, so the pickup process never sees a half-written
//! document. A final name that already exists is never replaced; the
//! delivery fails and the ledger records it for the next run.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use core_kernel::{DomainPort, PortError};
use domain_billing::OutboundTransport;

use crate::error::WorkerError;

/// Drops rendered documents into an outbox directory
#[derive(Debug, Clone)]
pub struct FileDropTransport {
    outbox: PathBuf,
}

impl FileDropTransport {
    pub fn new(outbox: impl Into<PathBuf>) -> Self {
        Self { outbox: outbox.into() }
    }

    /// Creates the outbox directory if needed
    pub async fn ensure_outbox(&self) -> Result<(), WorkerError> {
        tokio::fs::create_dir_all(&self.outbox)
            .await
            .map_err(|source| WorkerError::Outbox {
                path: self.outbox.clone(),
                source,
            })
    }

    pub fn outbox(&self) -> &Path {
        &self.outbox
    }
}

impl DomainPort for FileDropTransport {}

#[async_trait]
impl OutboundTransport for FileDropTransport {
    async fn deliver(&self, file_name: &str, payload: &[u8]) -> Result<(), PortError> {
        if file_name.is_empty() || file_name.contains(['/', '\\']) || file_name.starts_with('.') {
            return Err(PortError::validation(format!("invalid outbox file name: {}", file_name)));
        }

        let target = self.outbox.join(file_name);
        let partial = self.outbox.join(format!(".{}.partial", file_name));

        if let Err(e) = tokio::fs::write(&partial, payload).await {
            discard_partial(&partial).await;
            return Err(PortError::internal_with_source(format!("writing {}", partial.display()), e));
        }

        let linked = tokio::fs::hard_link(&partial, &target).await;
        discard_partial(&partial).await;
        linked.map_err(|e| match e.kind() {
            ErrorKind::AlreadyExists => PortError::conflict(format!("{} already in outbox", file_name)),
            _ => PortError::internal_with_source(format!("moving {} into outbox", file_name), e),
        })?;

        debug!(file = %target.display(), bytes = payload.len(), "document dropped in outbox");
        Ok(())
    }
}

async fn discard_partial(partial: &Path) {
    match tokio::fs::remove_file(partial).await {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(file = %partial.display(), error = %e, "could not remove partial file"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deliver_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FileDropTransport::new(dir.path());

        transport.deliver("GI_A_B_1_DUTY_20240305000000000.xml", b"<x/>").await.unwrap();

        let written = tokio::fs::read(dir.path().join("GI_A_B_1_DUTY_20240305000000000.xml")).await.unwrap();
        assert_eq!(written, b"<x/>");
        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut count = 0;
        while entries.next_entry().await.unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_existing_file_is_not_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FileDropTransport::new(dir.path());
        let name = "GI_A_B_1_CONTAINER_20240305000000000.xml";

        transport.deliver(name, b"<first/>").await.unwrap();
        let err = transport.deliver(name, b"<second/>").await.unwrap_err();

        assert!(matches!(err, PortError::Conflict { .. }));
        let kept = tokio::fs::read(dir.path().join(name)).await.unwrap();
        assert_eq!(kept, b"<first/>");
        assert!(!dir.path().join(format!(".{}.partial", name)).exists());
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FileDropTransport::new(dir.path());

        let err = transport.deliver("../escape.xml", b"<x/>").await.unwrap_err();
        assert!(matches!(err, PortError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_missing_outbox_fails_delivery() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FileDropTransport::new(dir.path().join("missing"));

        assert!(transport.deliver("GI.xml", b"<x/>").await.is_err());
        transport.ensure_outbox().await.unwrap();
        assert!(transport.deliver("GI.xml", b"<x/>").await.is_ok());
    }
}
