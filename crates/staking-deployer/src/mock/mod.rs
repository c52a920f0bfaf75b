//! Simulated chain, clock and file system used by the unit and integration
//! tests.
use crate::{Env, EnvConfigs, Signer};
use alloy::primitives::{Address, Bytes, U256};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub mod clock;
pub mod fs;
pub mod rpc;

pub use clock::FakeClock;
pub use rpc::{MockChainClient, MOCK_CHAIN_ID};

/// First development account of Hardhat and Anvil.
pub const MOCK_PRIVATE_KEY: &str =
    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

/// One interaction with the simulated chain or clock, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainCall {
    Deploy {
        code: Bytes,
    },
    Call {
        to: Address,
        method: &'static str,
    },
    Send {
        to: Address,
        method: &'static str,
        calldata: Bytes,
    },
    TokenBalance {
        token: Address,
        owner: Address,
    },
    TransferToken {
        token: Address,
        to: Address,
        amount: U256,
    },
    Sleep(Duration),
}

impl ChainCall {
    /// Whether the interaction submitted a transaction.
    pub fn is_submission(&self) -> bool {
        matches!(
            self,
            Self::Deploy { .. } | Self::Send { .. } | Self::TransferToken { .. }
        )
    }
}

/// Shared, ordered record of interactions.
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<ChainCall>>>);

impl CallLog {
    pub fn push(&self, call: ChainCall) {
        self.0.lock().unwrap().push(call);
    }

    pub fn entries(&self) -> Vec<ChainCall> {
        self.0.lock().unwrap().clone()
    }
}

pub fn mock_signer() -> Signer {
    Signer::from_private_key(MOCK_PRIVATE_KEY).unwrap()
}

pub fn mock_env_configs() -> EnvConfigs {
    EnvConfigs {
        network: "local".to_string(),
        rpc_url: "http://localhost:8545".to_string(),
        chain_id: MOCK_CHAIN_ID,
        required_confirmations: 1,
        confirmation_timeout: Duration::from_secs(30),
    }
}

pub fn mock_env(client: MockChainClient) -> Env {
    Env::with_client(mock_env_configs(), Arc::new(client))
}

/// Clock sharing the client's call log, so delays show up in `calls()`.
pub fn mock_clock(client: &MockChainClient) -> FakeClock {
    FakeClock::new(client.log())
}
