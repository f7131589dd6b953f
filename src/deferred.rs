use std::sync::Arc;

use tokio::sync::mpsc;

use crate::models::DocumentId;
use crate::pipeline::Pipeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VendorJob {
    pub document: DocumentId,
}

#[derive(Clone)]
pub struct DeferredQueue {
    tx: mpsc::UnboundedSender<VendorJob>,
}

impl DeferredQueue {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<VendorJob>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn schedule(&self, document: DocumentId) {
        if self.tx.send(VendorJob { document }).is_err() {
            tracing::warn!(document, "vendoring worker has stopped; job dropped");
        }
    }
}

/// Drains the queue one job at a time until every sender is dropped.
pub async fn run_worker(mut rx: mpsc::UnboundedReceiver<VendorJob>, pipeline: Arc<Pipeline>) {
    while let Some(job) = rx.recv().await {
        tracing::debug!(document = job.document, "running vendoring job");
        pipeline.process(job.document).await;
    }
    tracing::debug!("vendoring worker finished");
}
