//! Proposal worker: turns admitted blocks into subscriber notifications.

use proposal_alerts::{format_proposal_message, Notifier, SubscriptionKind};
use proposal_core::{extract_proposals, Block, TxnStatusIndex};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Per-block processing counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockReport {
    pub notified: usize,
    pub lookup_failures: usize,
    pub fanout_failures: usize,
}

pub struct ProposalPipeline {
    notifier: Notifier,
    explorer_url: String,
}

impl ProposalPipeline {
    pub fn new(notifier: Notifier, explorer_url: impl Into<String>) -> Self {
        Self {
            notifier,
            explorer_url: explorer_url.into(),
        }
    }

    /// Notify subscribers of every OK proposal in `block`.
    pub async fn process_block(&self, block: &Block) -> BlockReport {
        let index = TxnStatusIndex::from_block(block);
        let mut report = BlockReport::default();

        for result in extract_proposals(block, &index) {
            let notice = match result {
                Ok(notice) => notice,
                Err(e) => {
                    warn!(height = ?block.height, error = %e, "Skipping proposal");
                    report.lookup_failures += 1;
                    continue;
                }
            };

            let message = format_proposal_message(&notice, &self.explorer_url);
            match self
                .notifier
                .notify(&notice.symbol, SubscriptionKind::Proposal, &message)
                .await
            {
                Ok(summary) => {
                    debug!(
                        symbol = %notice.symbol,
                        proposal = %notice.proposal_id,
                        delivered = summary.delivered,
                        "Proposal notified"
                    );
                    report.notified += 1;
                }
                Err(e) => {
                    error!(
                        symbol = %notice.symbol,
                        proposal = %notice.proposal_id,
                        error = %e,
                        "Failed to notify subscribers"
                    );
                    report.fanout_failures += 1;
                }
            }
        }

        report
    }
}

/// Consume admitted blocks until every sender is dropped.
pub async fn run_proposal_worker(mut rx: mpsc::Receiver<Block>, pipeline: Arc<ProposalPipeline>) {
    info!("Proposal worker started");

    while let Some(block) = rx.recv().await {
        let report = pipeline.process_block(&block).await;
        if report != BlockReport::default() {
            info!(
                height = ?block.height,
                notified = report.notified,
                lookup_failures = report.lookup_failures,
                fanout_failures = report.fanout_failures,
                "Block processed"
            );
        }
    }

    info!("Proposal worker stopped");
}
