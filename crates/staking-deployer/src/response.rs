use alloy::primitives::{Address, TxHash};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Confirmed transaction as reported by a chain client.
///
/// Only the fields the deployment pipeline relies on are kept, so simulated
/// clients can produce receipts without building full node responses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxReceipt {
    /// Hash of the confirmed transaction
    pub tx_hash: TxHash,
    /// Block the transaction was included in, when the node reports it
    pub block_number: Option<u64>,
    /// Gas consumed by the transaction
    pub gas_used: u64,
    /// Address of the created contract for deployment transactions
    pub contract_address: Option<Address>,
}

impl TxReceipt {
    pub fn new(tx_hash: TxHash) -> Self {
        Self {
            tx_hash,
            block_number: None,
            gas_used: 0,
            contract_address: None,
        }
    }

    pub fn with_block_number(mut self, block_number: u64) -> Self {
        self.block_number = Some(block_number);
        self
    }

    pub fn with_contract_address(mut self, address: Address) -> Self {
        self.contract_address = Some(address);
        self
    }
}

impl fmt::Display for TxReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.block_number {
            Some(block) => write!(f, "{} (block {})", self.tx_hash, block),
            None => write!(f, "{}", self.tx_hash),
        }
    }
}
