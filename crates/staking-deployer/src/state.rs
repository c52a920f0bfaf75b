//! # Deployment State
//!
//! A run moves through
//! `NotStarted → FactoryDeployed → Initialized → RecordRead → Funded → Activated`.
//! Any failure ends in `Failed`, which remembers the step, the cause and the
//! last good state so an operator can resume from there.
//!
//! States serialize to JSON so a failed run can be stored and resumed later.
use crate::{env::EnvConfigs, error::DeployerError};
use alloy::primitives::{Address, TxHash, U256};
use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

/// Deployed factory contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactoryHandle {
    pub address: Address,
}

/// Staking rewards pool created by the factory's setup call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingRewardsRecord {
    pub index: u64,
    pub address: Address,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    ValidateParameters,
    DeployFactory,
    InitializeFactory,
    ReadStakingRewardsRecord,
    FundStakingRewards,
    WaitForPropagation,
    ActivateRewards,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::ValidateParameters => "validate_parameters",
            Step::DeployFactory => "deploy_factory",
            Step::InitializeFactory => "initialize_factory",
            Step::ReadStakingRewardsRecord => "read_staking_rewards_record",
            Step::FundStakingRewards => "fund_staking_rewards",
            Step::WaitForPropagation => "wait_for_propagation",
            Step::ActivateRewards => "activate_rewards",
        }
    }

    /// Whether running the step again can have no on-chain side effect.
    ///
    /// Every step that submits a transaction may already have landed when it
    /// failed (timeouts, cancellation), so repeating it could create a second
    /// factory or pool, or fund twice.
    pub fn is_retry_safe(&self) -> bool {
        matches!(
            self,
            Step::ValidateParameters | Step::ReadStakingRewardsRecord | Step::WaitForPropagation
        )
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A failed step together with the reason it failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepError {
    pub step: Step,
    pub cause: DeployerError,
}

impl StepError {
    pub fn new(step: Step, cause: DeployerError) -> Self {
        Self { step, cause }
    }
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.step, self.cause)
    }
}

impl Error for StepError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.cause)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DeploymentState {
    NotStarted,
    FactoryDeployed {
        factory: FactoryHandle,
    },
    Initialized {
        factory: FactoryHandle,
        setup_tx: TxHash,
    },
    RecordRead {
        factory: FactoryHandle,
        record: StakingRewardsRecord,
    },
    Funded {
        factory: FactoryHandle,
        record: StakingRewardsRecord,
        funded: U256,
    },
    Activated {
        factory: FactoryHandle,
        record: StakingRewardsRecord,
        activation_tx: TxHash,
    },
    Failed {
        step: Step,
        cause: DeployerError,
        last: Box<DeploymentState>,
    },
}

impl DeploymentState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NotStarted => "not_started",
            Self::FactoryDeployed { .. } => "factory_deployed",
            Self::Initialized { .. } => "initialized",
            Self::RecordRead { .. } => "record_read",
            Self::Funded { .. } => "funded",
            Self::Activated { .. } => "activated",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Activated { .. } | Self::Failed { .. })
    }

    /// Step that moves the run forward from here, `None` once terminal.
    pub fn next_step(&self) -> Option<Step> {
        match self {
            Self::NotStarted => Some(Step::DeployFactory),
            Self::FactoryDeployed { .. } => Some(Step::InitializeFactory),
            Self::Initialized { .. } => Some(Step::ReadStakingRewardsRecord),
            Self::RecordRead { .. } => Some(Step::FundStakingRewards),
            Self::Funded { .. } => Some(Step::ActivateRewards),
            Self::Activated { .. } | Self::Failed { .. } => None,
        }
    }

    /// Transactions the rest of the pipeline submits from this state.
    pub fn remaining_transactions(&self) -> u16 {
        match self {
            Self::NotStarted => 4,
            Self::FactoryDeployed { .. } => 3,
            Self::Initialized { .. } | Self::RecordRead { .. } => 2,
            Self::Funded { .. } => 1,
            Self::Activated { .. } => 0,
            Self::Failed { last, .. } => last.remaining_transactions(),
        }
    }

    pub fn factory(&self) -> Option<FactoryHandle> {
        match self {
            Self::NotStarted => None,
            Self::FactoryDeployed { factory }
            | Self::Initialized { factory, .. }
            | Self::RecordRead { factory, .. }
            | Self::Funded { factory, .. }
            | Self::Activated { factory, .. } => Some(*factory),
            Self::Failed { last, .. } => last.factory(),
        }
    }

    pub fn record(&self) -> Option<StakingRewardsRecord> {
        match self {
            Self::RecordRead { record, .. }
            | Self::Funded { record, .. }
            | Self::Activated { record, .. } => Some(*record),
            Self::Failed { last, .. } => last.record(),
            _ => None,
        }
    }

    /// Moves to `Failed`, keeping the current state as the resume point.
    pub(crate) fn fail(&mut self, step: Step, cause: DeployerError) {
        let last = std::mem::replace(self, Self::NotStarted);
        // a failure while already failed keeps the original resume point
        let last = match last {
            Self::Failed { last, .. } => last,
            other => Box::new(other),
        };
        *self = Self::Failed { step, cause, last };
    }
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed { step, cause, last } => {
                write!(f, "failed at {} ({}) after {}", step, cause, last.name())
            }
            other => f.write_str(other.name()),
        }
    }
}

/// Deployment state as written to a resume file, tied to the chain it ran on.
///
/// Contract addresses only mean something on the chain that created them, so
/// a saved state is refused on any other network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedDeployment {
    pub network: String,
    pub chain_id: u64,
    pub state: DeploymentState,
}

impl SavedDeployment {
    pub fn new(configs: &EnvConfigs, state: DeploymentState) -> Self {
        Self {
            network: configs.network.clone(),
            chain_id: configs.chain_id,
            state,
        }
    }

    /// Returns the saved state if it belongs to the network in `configs`.
    ///
    /// # Errors
    ///
    /// Returns `DeployerError::ResumeMismatch` when the network name or the
    /// chain id differ.
    pub fn into_state_for(self, configs: &EnvConfigs) -> Result<DeploymentState, DeployerError> {
        if self.chain_id != configs.chain_id || self.network != configs.network {
            return Err(DeployerError::ResumeMismatch(format!(
                "saved for {} (chain {}), running on {} (chain {})",
                self.network, self.chain_id, configs.network, configs.chain_id
            )));
        }
        Ok(self.state)
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentSummary {
    pub network: String,
    pub factory: Address,
    pub staking_rewards: Address,
    pub activation_tx: TxHash,
}

impl fmt::Display for DeploymentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Network: {}", self.network)?;
        writeln!(f, "Factory: {}", self.factory)?;
        write!(f, "Staking Rewards: {}", self.staking_rewards)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn factory() -> FactoryHandle {
        FactoryHandle {
            address: Address::repeat_byte(0xfa),
        }
    }

    fn record() -> StakingRewardsRecord {
        StakingRewardsRecord {
            index: 0,
            address: Address::repeat_byte(0xaa),
        }
    }

    #[test]
    fn next_step_follows_the_pipeline() {
        let states = [
            (DeploymentState::NotStarted, Some(Step::DeployFactory)),
            (
                DeploymentState::FactoryDeployed { factory: factory() },
                Some(Step::InitializeFactory),
            ),
            (
                DeploymentState::Initialized {
                    factory: factory(),
                    setup_tx: TxHash::ZERO,
                },
                Some(Step::ReadStakingRewardsRecord),
            ),
            (
                DeploymentState::RecordRead {
                    factory: factory(),
                    record: record(),
                },
                Some(Step::FundStakingRewards),
            ),
            (
                DeploymentState::Funded {
                    factory: factory(),
                    record: record(),
                    funded: U256::from(3),
                },
                Some(Step::ActivateRewards),
            ),
            (
                DeploymentState::Activated {
                    factory: factory(),
                    record: record(),
                    activation_tx: TxHash::ZERO,
                },
                None,
            ),
        ];

        for (state, expected) in states {
            assert_eq!(state.next_step(), expected, "{}", state);
        }
    }

    #[test]
    fn fail_keeps_the_last_good_state() {
        let mut state = DeploymentState::RecordRead {
            factory: factory(),
            record: record(),
        };
        state.fail(Step::FundStakingRewards, DeployerError::Cancelled);
        state.fail(Step::ActivateRewards, DeployerError::Cancelled);

        match &state {
            DeploymentState::Failed { step, last, .. } => {
                assert_eq!(*step, Step::ActivateRewards);
                assert_eq!(last.name(), "record_read");
            }
            other => panic!("unexpected state {other}"),
        }
        assert!(state.is_terminal());
        assert_eq!(state.factory(), Some(factory()));
        assert_eq!(state.record(), Some(record()));
        assert_eq!(state.next_step(), None);
    }

    #[test]
    fn failed_state_survives_json() {
        let mut state = DeploymentState::FactoryDeployed { factory: factory() };
        state.fail(
            Step::InitializeFactory,
            DeployerError::Timeout("no receipt".to_string()),
        );

        let json = serde_json::to_string_pretty(&state).unwrap();
        assert!(json.contains("\"initialize_factory\""));
        let back: DeploymentState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn saved_state_only_resumes_on_its_own_network() {
        let local = crate::mock::mock_env_configs();
        let state = DeploymentState::FactoryDeployed { factory: factory() };
        let saved = SavedDeployment::new(&local, state.clone());

        let json = serde_json::to_string(&saved).unwrap();
        let back: SavedDeployment = serde_json::from_str(&json).unwrap();
        assert_eq!(back.clone().into_state_for(&local).unwrap(), state);

        let rinkeby = EnvConfigs {
            network: "boba_rinkeby".to_string(),
            chain_id: 28,
            ..local.clone()
        };
        assert!(matches!(
            back.clone().into_state_for(&rinkeby),
            Err(DeployerError::ResumeMismatch(msg)) if msg.contains("chain 28")
        ));

        // same chain id under another name is still refused
        let renamed = EnvConfigs {
            network: "anvil".to_string(),
            ..local
        };
        assert!(back.into_state_for(&renamed).is_err());
    }

    #[test]
    fn only_read_and_wait_steps_are_retry_safe() {
        assert!(Step::ReadStakingRewardsRecord.is_retry_safe());
        assert!(Step::WaitForPropagation.is_retry_safe());
        assert!(!Step::InitializeFactory.is_retry_safe());
        assert!(!Step::FundStakingRewards.is_retry_safe());
        assert!(!Step::ActivateRewards.is_retry_safe());
        assert!(!Step::DeployFactory.is_retry_safe());
    }
}
