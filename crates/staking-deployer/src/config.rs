//! # Configuration
//!
//! A run is configured from three layers, later ones winning:
//!
//! 1. built-in network presets and the default farm parameters
//! 2. an optional TOML file with `[networks.<name>]`, `[deployment]` and
//!    `[artifacts]` sections
//! 3. command line flags and environment variables (`RPC_URL`)
//!
//! The deployer key is only ever read from the environment
//! (`DEPLOYER_PRIVATE_KEY`, usually through a `.env` file).
use crate::{
    env::{EnvConfigs, DEFAULT_REQUIRED_CONFIRMATIONS},
    error::DeployerError,
    fs::{DefaultFileReader, FileReader},
    orchestrator::{FundingTarget, OrchestratorConfigs, DEFAULT_FUNDING_MULTIPLE},
    params::{parse_amount, DeploymentParameters},
};
use alloy::primitives::{address, Address, U256};
use serde::Deserialize;
use std::{collections::BTreeMap, str::FromStr, time::Duration};

pub const PRIVATE_KEY_VAR: &str = "DEPLOYER_PRIVATE_KEY";
pub const RPC_URL_VAR: &str = "RPC_URL";

pub const DEFAULT_NETWORK: &str = "boba_mainnet";
pub const DEFAULT_FACTORY_ARTIFACT: &str = "build/contracts/GinLockedStakingRewardsFactory.json";

/// GIN token on Boba mainnet.
pub const DEFAULT_REWARD_TOKEN: Address = address!("ce407B8Bc78274E6338E7a1eB4C9F4c4374bFAcf");
pub const DEFAULT_REWARD_AMOUNT: &str = "86400e18";
pub const DEFAULT_REWARD_DURATION: u64 = 86_400;
pub const DEFAULT_LOCK_PERIOD: u64 = 600;
pub const DEFAULT_COOLDOWN_PERIOD: u64 = 600;
pub const DEFAULT_BOOST_MULTIPLIER: u64 = 2;
pub const DEFAULT_PROPAGATION_DELAY_SECS: u64 = 3;

const DEFAULT_CONFIRMATION_TIMEOUT_SECS: u64 = 30;

fn default_required_confirmations() -> u64 {
    DEFAULT_REQUIRED_CONFIRMATIONS
}

fn default_confirmation_timeout_secs() -> u64 {
    DEFAULT_CONFIRMATION_TIMEOUT_SECS
}

/// Endpoint and confirmation policy of one network.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    #[serde(default = "default_required_confirmations")]
    pub required_confirmations: u64,
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
}

impl NetworkConfig {
    /// Built-in networks: `boba_mainnet`, `boba_rinkeby` and `local`.
    pub fn preset(name: &str) -> Option<Self> {
        let (rpc_url, chain_id, confirmation_timeout_secs) = match name {
            "boba_mainnet" => ("https://mainnet.boba.network", 288, 300),
            "boba_rinkeby" => ("wss://wss.rinkeby.boba.network/", 28, 60),
            "local" => ("http://localhost:8545", 31337, DEFAULT_CONFIRMATION_TIMEOUT_SECS),
            _ => return None,
        };
        Some(Self {
            rpc_url: rpc_url.to_string(),
            chain_id,
            required_confirmations: DEFAULT_REQUIRED_CONFIRMATIONS,
            confirmation_timeout_secs,
        })
    }

    pub fn env_configs(&self, network: &str) -> EnvConfigs {
        EnvConfigs {
            network: network.to_string(),
            rpc_url: self.rpc_url.clone(),
            chain_id: self.chain_id,
            required_confirmations: self.required_confirmations,
            confirmation_timeout: Duration::from_secs(self.confirmation_timeout_secs),
        }
    }
}

/// `[deployment]` section. Amounts are strings so they can use `86400e18`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeploymentSection {
    pub reward_token: Option<String>,
    pub reward_amount: Option<String>,
    pub reward_duration: Option<u64>,
    pub lock_period: Option<u64>,
    pub cooldown_period: Option<u64>,
    pub boost_multiplier: Option<u64>,
    pub funding_multiple: Option<u64>,
    pub funding_target: Option<FundingTarget>,
    pub record_index: Option<u64>,
    pub propagation_delay_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactsSection {
    /// Compiled factory artifact
    pub factory: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkConfig>,
    #[serde(default)]
    pub deployment: DeploymentSection,
    #[serde(default)]
    pub artifacts: ArtifactsSection,
}

impl FileConfig {
    pub fn load(
        path: &str,
        file_reader: Option<Box<dyn FileReader>>,
    ) -> Result<Self, DeployerError> {
        let reader = file_reader.unwrap_or_else(|| Box::new(DefaultFileReader));
        let raw = reader.read(path)?;
        let text = String::from_utf8(raw)
            .map_err(|e| DeployerError::InvalidConfig(format!("{}: {}", path, e)))?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, DeployerError> {
        Ok(toml::from_str(text)?)
    }

    /// Looks a network up in the file first, then in the presets.
    pub fn network(&self, name: &str) -> Result<NetworkConfig, DeployerError> {
        self.networks
            .get(name)
            .cloned()
            .or_else(|| NetworkConfig::preset(name))
            .ok_or_else(|| DeployerError::InvalidConfig(format!("unknown network {:?}", name)))
    }
}

/// Flags given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub network: Option<String>,
    pub rpc_url: Option<String>,
    pub factory_artifact: Option<String>,
}

/// Everything a run needs, with every layer applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub env: EnvConfigs,
    pub params: DeploymentParameters,
    pub orchestrator: OrchestratorConfigs,
    pub factory_artifact: String,
}

/// Merges presets, the file and the overrides.
///
/// Parameters are not validated here; the pipeline does that as its first
/// step so an invalid set still produces a `Failed` state.
pub fn resolve(file: &FileConfig, overrides: &Overrides) -> Result<ResolvedConfig, DeployerError> {
    let network = overrides.network.as_deref().unwrap_or(DEFAULT_NETWORK);
    let mut env = file.network(network)?.env_configs(network);
    if let Some(rpc_url) = &overrides.rpc_url {
        env.rpc_url = rpc_url.clone();
    }

    let deployment = &file.deployment;
    let reward_token = match &deployment.reward_token {
        Some(token) => Address::from_str(token.trim()).map_err(|e| {
            DeployerError::InvalidConfig(format!("reward_token {:?}: {}", token, e))
        })?,
        None => DEFAULT_REWARD_TOKEN,
    };
    let reward_amount: U256 =
        parse_amount(deployment.reward_amount.as_deref().unwrap_or(DEFAULT_REWARD_AMOUNT))?;

    let params = DeploymentParameters::new(
        reward_token,
        reward_amount,
        deployment.reward_duration.unwrap_or(DEFAULT_REWARD_DURATION),
        deployment.lock_period.unwrap_or(DEFAULT_LOCK_PERIOD),
        deployment.cooldown_period.unwrap_or(DEFAULT_COOLDOWN_PERIOD),
        deployment.boost_multiplier.unwrap_or(DEFAULT_BOOST_MULTIPLIER),
    );

    // the GIN factory pays its pools out of its own balance
    let orchestrator = OrchestratorConfigs {
        funding_multiple: deployment.funding_multiple.unwrap_or(DEFAULT_FUNDING_MULTIPLE),
        funding_target: deployment.funding_target.unwrap_or(FundingTarget::Factory),
        record_index: deployment.record_index.unwrap_or(0),
        propagation_delay: Duration::from_secs(
            deployment
                .propagation_delay_secs
                .unwrap_or(DEFAULT_PROPAGATION_DELAY_SECS),
        ),
    };

    let factory_artifact = overrides
        .factory_artifact
        .clone()
        .or_else(|| file.artifacts.factory.clone())
        .unwrap_or_else(|| DEFAULT_FACTORY_ARTIFACT.to_string());

    Ok(ResolvedConfig {
        env,
        params,
        orchestrator,
        factory_artifact,
    })
}

/// Reads the deployer key from the process environment.
pub fn private_key_from_env() -> Result<String, DeployerError> {
    std::env::var(PRIVATE_KEY_VAR)
        .map_err(|_| DeployerError::InvalidConfig(format!("{} must be set", PRIVATE_KEY_VAR)))
}
