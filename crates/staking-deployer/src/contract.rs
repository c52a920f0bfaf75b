//! # Contract Artifacts and Bindings
//!
//! Loads the compiled factory bytecode from a JSON artifact and declares the
//! ABI of the two contracts the deployment talks to: the staking rewards
//! factory and the ERC-20 reward token.
//!
//! Both Truffle (`"bytecode": "0x..."`) and Foundry
//! (`"bytecode": { "object": "0x..." }`) artifact layouts are accepted.
use crate::{
    error::DeployerError,
    fs::{DefaultFileReader, FileReader},
    response::TxReceipt,
    Env,
};
use alloy::{
    primitives::{Address, Bytes},
    sol,
};
use serde::Deserialize;

sol! {
    /// Locked staking rewards factory: creates one staking rewards pool per
    /// `deploy` call and pushes the funded rewards into every pool on
    /// `notifyRewardAmounts`.
    interface IStakingRewardsFactory {
        function deploy(
            address stakingToken,
            uint256 rewardAmount,
            uint256 rewardsDuration,
            uint256 lockPeriod,
            uint256 cooldownPeriod,
            uint256 boostMultiplier
        ) external;

        function stakingRewardsInfoList(uint256 index)
            external
            view
            returns (address stakingRewards, uint256 rewardAmount);

        function notifyRewardAmounts() external;
    }

    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
    }
}

#[derive(Deserialize)]
struct Artifact {
    #[serde(rename = "contractName", default)]
    contract_name: Option<String>,
    bytecode: ArtifactBytecode,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ArtifactBytecode {
    Hex(String),
    Object { object: String },
}

impl ArtifactBytecode {
    fn as_hex(&self) -> &str {
        match self {
            Self::Hex(hex) => hex,
            Self::Object { object } => object,
        }
    }
}

/// Compiled contract ready to be deployed.
#[derive(Debug, Clone)]
pub struct Contract {
    name: String,
    bytecode: Bytes,
}

impl Contract {
    /// Loads a compiled contract from a JSON artifact.
    ///
    /// # Parameters
    ///
    /// * `artifact_path` - Path to the artifact produced by the contract toolchain
    /// * `file_reader` - Optional reader, defaults to reading from disk
    ///
    /// # Errors
    ///
    /// Returns `DeployerError::ArtifactError` when the artifact carries no
    /// deployable bytecode, e.g. an interface, an abstract contract or a
    /// contract with unlinked libraries.
    pub fn new(
        artifact_path: &str,
        file_reader: Option<Box<dyn FileReader>>,
    ) -> Result<Self, DeployerError> {
        let reader = file_reader.unwrap_or_else(|| Box::new(DefaultFileReader));
        let raw = reader.read(artifact_path)?;
        let artifact: Artifact = serde_json::from_slice(&raw)?;

        let name = artifact.contract_name.unwrap_or_else(|| {
            std::path::Path::new(artifact_path)
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| artifact_path.to_string())
        });
        let bytecode = decode_bytecode(&name, artifact.bytecode.as_hex())?;

        Ok(Self { name, bytecode })
    }

    pub fn from_bytecode(name: impl Into<String>, bytecode: Bytes) -> Self {
        Self {
            name: name.into(),
            bytecode,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytecode(&self) -> &Bytes {
        &self.bytecode
    }

    /// Creation code followed by the ABI-encoded constructor arguments.
    pub fn deploy_code(&self, constructor_args: &[u8]) -> Bytes {
        let mut code = Vec::with_capacity(self.bytecode.len() + constructor_args.len());
        code.extend_from_slice(&self.bytecode);
        code.extend_from_slice(constructor_args);
        code.into()
    }

    /// Deploys the contract and waits for the creation receipt.
    ///
    /// # Returns
    ///
    /// The address of the new contract together with its receipt.
    pub async fn deploy(
        &self,
        env: &mut Env,
        constructor_args: &[u8],
    ) -> Result<(Address, TxReceipt), DeployerError> {
        let receipt = env.deploy(self.deploy_code(constructor_args)).await?;
        let address = receipt.contract_address.ok_or_else(|| {
            DeployerError::TransactionRejected(format!(
                "{} creation {} produced no contract address",
                self.name, receipt.tx_hash
            ))
        })?;

        tracing::info!(contract = %self.name, %address, tx = %receipt.tx_hash, "contract deployed");
        Ok((address, receipt))
    }
}

fn decode_bytecode(name: &str, hex_code: &str) -> Result<Bytes, DeployerError> {
    let stripped = hex_code.trim().trim_start_matches("0x");
    if stripped.is_empty() {
        return Err(DeployerError::ArtifactError(format!(
            "{} has no bytecode (interface or abstract contract?)",
            name
        )));
    }
    if stripped.contains("__") {
        return Err(DeployerError::ArtifactError(format!(
            "{} has unlinked library placeholders",
            name
        )));
    }

    hex::decode(stripped)
        .map(Bytes::from)
        .map_err(|e| DeployerError::ArtifactError(format!("{} bytecode: {}", name, e)))
}
