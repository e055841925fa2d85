//! Ledger block shapes relevant to governance notifications.
//!
//! Only the fields the notifier reads are modelled. Hashes travel as hex
//! strings on the wire.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Outcome code recorded for each transaction in a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxnStatus {
    Ok,
    #[default]
    FaultyTxn,
    InsufficientAmount,
    InsufficientContractFees,
    InvalidContract,
    InvalidParameters,
    InvalidUtxo,
    ProposalRejected,
    /// Any code this build does not know about.
    #[serde(other)]
    Unknown,
}

impl TxnStatus {
    pub fn is_ok(self) -> bool {
        self == TxnStatus::Ok
    }
}

/// Common transaction header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxnBase {
    /// Content hash of the transaction.
    #[serde(with = "hex::serde")]
    pub hash: Vec<u8>,
}

/// A governance proposal transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceProposal {
    pub base: TxnBase,
    /// Contract the proposal governs, e.g. `$ZRA+0000`.
    pub contract_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub synopsis: String,
}

impl GovernanceProposal {
    pub fn hash(&self) -> &[u8] {
        &self.base.hash
    }

    /// Hex form of the content hash, used for display and explorer links.
    pub fn id_hex(&self) -> String {
        hex::encode(&self.base.hash)
    }
}

/// Fee/status entry for one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxnStatusFees {
    #[serde(with = "hex::serde")]
    pub txn_hash: Vec<u8>,
    pub status: TxnStatus,
}

/// Transactions carried by a block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockTransactions {
    #[serde(default)]
    pub governance_proposals: Vec<GovernanceProposal>,
    #[serde(default)]
    pub txn_fees_and_status: Vec<TxnStatusFees>,
}

/// A broadcast block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    #[serde(default)]
    pub height: Option<u64>,
    #[serde(default)]
    pub transactions: BlockTransactions,
}

/// Transaction hash -> status lookup for a single block.
#[derive(Debug, Clone, Default)]
pub struct TxnStatusIndex {
    statuses: HashMap<Vec<u8>, TxnStatus>,
}

impl TxnStatusIndex {
    /// Build the index from a block's status table.
    ///
    /// If a hash appears more than once, the first entry wins.
    pub fn from_block(block: &Block) -> Self {
        let mut statuses = HashMap::with_capacity(block.transactions.txn_fees_and_status.len());
        for entry in &block.transactions.txn_fees_and_status {
            statuses
                .entry(entry.txn_hash.clone())
                .or_insert(entry.status);
        }
        Self { statuses }
    }

    pub fn status(&self, txn_hash: &[u8]) -> Option<TxnStatus> {
        self.statuses.get(txn_hash).copied()
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_json_shape() {
        let json = r#"{
            "height": 7,
            "transactions": {
                "governance_proposals": [
                    {"base": {"hash": "0a0b"}, "contract_id": "$ZRA+0000", "title": "t", "synopsis": "s"}
                ],
                "txn_fees_and_status": [
                    {"txn_hash": "0a0b", "status": "OK"},
                    {"txn_hash": "ff", "status": "SOMETHING_NEW"}
                ]
            }
        }"#;

        let block: Block = serde_json::from_str(json).unwrap();
        assert_eq!(block.height, Some(7));
        let proposal = &block.transactions.governance_proposals[0];
        assert_eq!(proposal.hash(), &[0x0a, 0x0b]);
        assert_eq!(proposal.id_hex(), "0a0b");
        assert_eq!(block.transactions.txn_fees_and_status[1].status, TxnStatus::Unknown);
    }

    #[test]
    fn test_missing_sections_default_empty() {
        let block: Block = serde_json::from_str("{}").unwrap();
        assert!(block.transactions.governance_proposals.is_empty());
        assert!(TxnStatusIndex::from_block(&block).is_empty());
    }

    #[test]
    fn test_index_first_entry_wins() {
        let mut block = Block::default();
        block.transactions.txn_fees_and_status = vec![
            TxnStatusFees { txn_hash: vec![1], status: TxnStatus::Ok },
            TxnStatusFees { txn_hash: vec![1], status: TxnStatus::ProposalRejected },
            TxnStatusFees { txn_hash: vec![2], status: TxnStatus::FaultyTxn },
        ];

        let index = TxnStatusIndex::from_block(&block);
        assert_eq!(index.len(), 2);
        assert_eq!(index.status(&[1]), Some(TxnStatus::Ok));
        assert_eq!(index.status(&[2]), Some(TxnStatus::FaultyTxn));
        assert_eq!(index.status(&[3]), None);
    }
}
