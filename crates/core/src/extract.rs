//! Proposal extraction from a broadcast block.

use crate::proposal::{Block, GovernanceProposal, TxnStatusIndex};
use crate::symbol::canonical_or_raw;
use crate::text::truncate;
use compact_str::CompactString;
use thiserror::Error;

/// Display bound for proposal titles, in characters.
pub const TITLE_MAX_CHARS: usize = 100;
/// Display bound for proposal synopses, in characters.
pub const SYNOPSIS_MAX_CHARS: usize = 500;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("transaction status not found for {txn_hash}")]
    LookupFailure { txn_hash: String },
}

/// A proposal that passed the status filter, with display fields bounded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalNotice {
    /// Symbol the proposal governs; the key for subscriber lookup.
    pub symbol: CompactString,
    pub title: String,
    pub synopsis: String,
    /// Hex-encoded content hash.
    pub proposal_id: String,
}

impl ProposalNotice {
    fn from_proposal(proposal: &GovernanceProposal) -> Self {
        Self {
            symbol: canonical_or_raw(&proposal.contract_id),
            title: truncate(proposal.title.trim(), TITLE_MAX_CHARS),
            synopsis: truncate(proposal.synopsis.trim(), SYNOPSIS_MAX_CHARS),
            proposal_id: proposal.id_hex(),
        }
    }
}

/// Yield every proposal in `block` whose transaction status is OK.
///
/// A proposal with no status entry yields an `Err` and the walk continues.
/// Proposals with any other status are skipped silently. `index` must have
/// been built from the same block.
pub fn extract_proposals<'a>(
    block: &'a Block,
    index: &'a TxnStatusIndex,
) -> impl Iterator<Item = Result<ProposalNotice, ExtractError>> + 'a {
    block
        .transactions
        .governance_proposals
        .iter()
        .filter_map(move |proposal| match index.status(proposal.hash()) {
            None => Some(Err(ExtractError::LookupFailure {
                txn_hash: proposal.id_hex(),
            })),
            Some(status) if status.is_ok() => Some(Ok(ProposalNotice::from_proposal(proposal))),
            Some(_) => None,
        })
}
