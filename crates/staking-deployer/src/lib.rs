//! Deploys a locked staking rewards factory, creates its first staking rewards
//! pool, funds it and starts the reward period.
//!
//! The [`Orchestrator`] drives the pipeline through an [`Env`], which wraps a
//! [`ChainClient`] with the target network's limits. [`mock`] provides a
//! simulated chain for tests.
mod clock;
pub mod config;
mod contract;
mod env;
mod error;
mod fs;
mod guard;
pub mod logging;
pub mod mock;
mod orchestrator;
mod params;
mod response;
mod rpc;
mod signer;
mod state;

pub use clock::{Clock, TokioClock};
pub use contract::{Contract, IStakingRewardsFactory, IERC20};
pub use env::{Env, EnvConfigs, DEFAULT_CONFIRMATION_TIMEOUT, DEFAULT_REQUIRED_CONFIRMATIONS};
pub use error::DeployerError;
pub use fs::{DefaultFileReader, FileReader};
pub use guard::Guard;
pub use orchestrator::{
    FundingTarget, Orchestrator, OrchestratorConfigs, DEFAULT_FUNDING_MULTIPLE,
    DEFAULT_PROPAGATION_DELAY,
};
pub use params::{parse_amount, DeploymentParameters};
pub use response::TxReceipt;
pub use rpc::{ChainClient, ContractCall, ExternalChainClient};
pub use signer::Signer;
pub use state::{
    DeploymentState, DeploymentSummary, FactoryHandle, SavedDeployment, StakingRewardsRecord, Step,
    StepError,
};

// re-exports
pub use alloy::primitives::{Address, U256};
