//! # Deployment Orchestrator
//!
//! Runs the deployment pipeline against one network:
//!
//! 1. deploy the factory with the reward token as constructor argument
//! 2. call the factory setup entrypoint, creating staking rewards pool 0
//! 3. read the pool address back from the factory
//! 4. transfer `funding_multiple` periods worth of reward tokens
//! 5. wait for the transfer to propagate
//! 6. call `notifyRewardAmounts` to start the reward period
//!
//! Steps run strictly one after another and each one only starts after the
//! previous transaction is confirmed. A failure halts the run in
//! [`DeploymentState::Failed`]; nothing is retried automatically because none
//! of the submitting steps are idempotent.
use crate::{
    clock::{Clock, TokioClock},
    contract::{Contract, IStakingRewardsFactory},
    error::DeployerError,
    params::DeploymentParameters,
    response::TxReceipt,
    rpc::ContractCall,
    state::{
        DeploymentState, DeploymentSummary, FactoryHandle, SavedDeployment, StakingRewardsRecord,
        Step, StepError,
    },
    Env,
};
use alloy::{
    primitives::{Address, U256},
    sol_types::{SolCall, SolValue},
};
use serde::Deserialize;
use std::{future::Future, sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_FUNDING_MULTIPLE: u64 = 3;
pub const DEFAULT_PROPAGATION_DELAY: Duration = Duration::from_secs(3);

/// Where the reward tokens are transferred to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundingTarget {
    /// The staking rewards pool created by the setup call.
    #[default]
    StakingRewards,
    /// The factory itself, for factories that forward rewards to their pools
    /// when `notifyRewardAmounts` is called.
    Factory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfigs {
    /// Reward periods funded up front
    pub funding_multiple: u64,
    pub funding_target: FundingTarget,
    /// Factory index of the pool created by this run
    pub record_index: u64,
    /// Delay between funding and activation
    pub propagation_delay: Duration,
}

impl Default for OrchestratorConfigs {
    fn default() -> Self {
        Self {
            funding_multiple: DEFAULT_FUNDING_MULTIPLE,
            funding_target: FundingTarget::default(),
            record_index: 0,
            propagation_delay: DEFAULT_PROPAGATION_DELAY,
        }
    }
}

pub struct Orchestrator {
    env: Env,
    factory_contract: Contract,
    params: DeploymentParameters,
    configs: OrchestratorConfigs,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
    state: DeploymentState,
}

impl Orchestrator {
    pub fn new(
        env: Env,
        factory_contract: Contract,
        params: DeploymentParameters,
        configs: OrchestratorConfigs,
    ) -> Self {
        Self {
            env,
            factory_contract,
            params,
            configs,
            clock: Arc::new(TokioClock),
            cancel: CancellationToken::new(),
            state: DeploymentState::NotStarted,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Token that interrupts any wait of the run when cancelled.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Continues a previous run from `state`.
    ///
    /// A `Failed` state resumes from its last good state. If the failed step
    /// submits transactions and the failure may have reached the chain, the
    /// operator has to check the chain and pass `confirm_retry`.
    ///
    /// # Errors
    ///
    /// Returns `DeployerError::UnconfirmedRetry` when confirmation is required
    /// but was not given.
    pub fn resume(
        mut self,
        state: DeploymentState,
        confirm_retry: bool,
    ) -> Result<Self, DeployerError> {
        self.state = match state {
            DeploymentState::Failed { step, cause, last } => {
                if !step.is_retry_safe() && !cause.was_not_submitted() && !confirm_retry {
                    return Err(DeployerError::UnconfirmedRetry(format!(
                        "{} failed with \"{}\" and may have reached the chain; \
                         inspect the chain state before retrying",
                        step, cause
                    )));
                }
                tracing::warn!(
                    %step,
                    %cause,
                    resume_from = last.name(),
                    "resuming failed deployment"
                );
                *last
            }
            other => other,
        };
        Ok(self)
    }

    pub fn state(&self) -> &DeploymentState {
        &self.state
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn into_state(self) -> DeploymentState {
        self.state
    }

    /// Current state labelled with the network it belongs to.
    pub fn snapshot(&self) -> SavedDeployment {
        SavedDeployment::new(self.env.configs(), self.state.clone())
    }

    /// Runs every remaining step.
    ///
    /// # Returns
    ///
    /// The factory and staking rewards addresses once rewards are active, or
    /// the step that failed together with its cause.
    pub async fn run(&mut self) -> Result<DeploymentSummary, StepError> {
        if let DeploymentState::Failed { step, cause, .. } = &self.state {
            return Err(StepError::new(*step, cause.clone()));
        }

        let funding = self.validate_parameters()?;
        tracing::info!(
            network = self.env.network(),
            state = self.state.name(),
            %funding,
            "starting deployment"
        );

        loop {
            match self.state.clone() {
                DeploymentState::NotStarted => {
                    self.deploy_factory(self.params.reward_token()).await?;
                }
                DeploymentState::FactoryDeployed { factory } => {
                    let params = self.params.clone();
                    self.initialize_factory(&factory, &params).await?;
                }
                DeploymentState::Initialized { factory, .. } => {
                    self.read_staking_rewards_record(&factory, self.configs.record_index)
                        .await?;
                }
                DeploymentState::RecordRead { record, .. } => {
                    self.fund_staking_rewards(&record, funding).await?;
                }
                DeploymentState::Funded { factory, .. } => {
                    self.wait_for_propagation(self.configs.propagation_delay)
                        .await?;
                    self.activate_rewards(&factory).await?;
                }
                DeploymentState::Activated {
                    factory,
                    record,
                    activation_tx,
                } => {
                    tracing::info!(
                        factory = %factory.address,
                        staking_rewards = %record.address,
                        "farm started"
                    );
                    return Ok(DeploymentSummary {
                        network: self.env.network().to_string(),
                        factory: factory.address,
                        staking_rewards: record.address,
                        activation_tx,
                    });
                }
                DeploymentState::Failed { step, cause, .. } => {
                    return Err(StepError::new(step, cause));
                }
            }
        }
    }

    /// Checks the parameters and computes the funding amount. Sends nothing.
    pub fn validate_parameters(&mut self) -> Result<U256, StepError> {
        let checked = self
            .params
            .validate()
            .and_then(|_| self.params.funding_amount(self.configs.funding_multiple));
        match checked {
            Ok(amount) => Ok(amount),
            Err(cause) => self.fail(Step::ValidateParameters, cause),
        }
    }

    pub async fn deploy_factory(
        &mut self,
        reward_token: Address,
    ) -> Result<FactoryHandle, StepError> {
        let step = Step::DeployFactory;
        if !matches!(self.state, DeploymentState::NotStarted) {
            return Err(self.out_of_order(step));
        }

        tracing::info!(contract = self.factory_contract.name(), %reward_token, "deploying factory");
        let cancel = self.cancel.clone();
        let res = cancellable(
            &cancel,
            self.factory_contract
                .deploy(&mut self.env, &reward_token.abi_encode()),
        )
        .await;

        match res {
            Ok((address, _)) => {
                let factory = FactoryHandle { address };
                self.state = DeploymentState::FactoryDeployed { factory };
                Ok(factory)
            }
            Err(cause) => self.fail(step, cause),
        }
    }

    /// Calls the factory setup entrypoint. Sends nothing when the parameters
    /// are invalid.
    pub async fn initialize_factory(
        &mut self,
        factory: &FactoryHandle,
        params: &DeploymentParameters,
    ) -> Result<TxReceipt, StepError> {
        let step = Step::InitializeFactory;
        if self.state != (DeploymentState::FactoryDeployed { factory: *factory }) {
            return Err(self.out_of_order(step));
        }
        if let Err(cause) = params.validate() {
            return self.fail(step, cause);
        }

        let call = ContractCall::new(&params.setup_call());
        tracing::info!(
            factory = %factory.address,
            token = %params.reward_token(),
            reward_amount = %params.reward_amount(),
            reward_duration = params.reward_duration(),
            lock_period = params.lock_period(),
            cooldown_period = params.cooldown_period(),
            boost_multiplier = params.boost_multiplier(),
            "initializing factory"
        );

        let cancel = self.cancel.clone();
        match cancellable(&cancel, self.env.send(factory.address, call)).await {
            Ok(receipt) => {
                tracing::debug!(?receipt, "setup receipt");
                self.state = DeploymentState::Initialized {
                    factory: *factory,
                    setup_tx: receipt.tx_hash,
                };
                Ok(receipt)
            }
            Err(cause) => self.fail(step, cause),
        }
    }

    /// Reads pool `index` from the factory. Pure read; may be repeated.
    pub async fn read_staking_rewards_record(
        &mut self,
        factory: &FactoryHandle,
        index: u64,
    ) -> Result<StakingRewardsRecord, StepError> {
        let step = Step::ReadStakingRewardsRecord;
        let in_order = match &self.state {
            DeploymentState::Initialized { factory: f, .. }
            | DeploymentState::RecordRead { factory: f, .. } => f == factory,
            _ => false,
        };
        if !in_order {
            return Err(self.out_of_order(step));
        }

        let call = IStakingRewardsFactory::stakingRewardsInfoListCall {
            index: U256::from(index),
        };
        let cancel = self.cancel.clone();
        let res = cancellable(&cancel, self.env.call(factory.address, ContractCall::new(&call)))
            .await
            .and_then(|data| {
                IStakingRewardsFactory::stakingRewardsInfoListCall::abi_decode_returns(&data)
                    .map_err(|_| DeployerError::RecordNotFound(index))
            });

        match res {
            Ok(info) if !info.stakingRewards.is_zero() => {
                let record = StakingRewardsRecord {
                    index,
                    address: info.stakingRewards,
                };
                tracing::info!(index, staking_rewards = %record.address, "staking rewards record");
                self.state = DeploymentState::RecordRead {
                    factory: *factory,
                    record,
                };
                Ok(record)
            }
            // out of range indexes revert; unset slots decode to the zero address
            Ok(_) | Err(DeployerError::CallReverted(_)) => {
                self.fail(step, DeployerError::RecordNotFound(index))
            }
            Err(cause) => self.fail(step, cause),
        }
    }

    /// Transfers `amount` reward tokens from the deployer to the funding target.
    pub async fn fund_staking_rewards(
        &mut self,
        record: &StakingRewardsRecord,
        amount: U256,
    ) -> Result<TxReceipt, StepError> {
        let step = Step::FundStakingRewards;
        let factory = match &self.state {
            DeploymentState::RecordRead { factory, record: r } if r == record => *factory,
            _ => return Err(self.out_of_order(step)),
        };
        if amount.is_zero() {
            return self.fail(
                step,
                DeployerError::InvalidParameters("funding amount must be > 0".to_string()),
            );
        }

        let token = self.params.reward_token();
        let target = self.funding_target(&factory, record);
        let deployer = self.env.deployer();
        let cancel = self.cancel.clone();

        let available = match cancellable(&cancel, self.env.token_balance(token, deployer)).await {
            Ok(balance) => balance,
            Err(cause) => return self.fail(step, cause),
        };
        if available < amount {
            return self.fail(
                step,
                DeployerError::InsufficientBalance {
                    required: amount,
                    available,
                },
            );
        }

        tracing::info!(%token, %target, %amount, "funding staking rewards");
        match cancellable(&cancel, self.env.transfer_token(token, target, amount)).await {
            Ok(receipt) => {
                self.state = DeploymentState::Funded {
                    factory,
                    record: *record,
                    funded: amount,
                };
                Ok(receipt)
            }
            Err(cause) => self.fail(step, cause),
        }
    }

    /// Waits before activation so the funding is visible to the node serving
    /// the activation call. Cancellable; sends nothing.
    pub async fn wait_for_propagation(&mut self, duration: Duration) -> Result<(), StepError> {
        let step = Step::WaitForPropagation;
        if !matches!(self.state, DeploymentState::Funded { .. }) {
            return Err(self.out_of_order(step));
        }

        tracing::info!(?duration, "waiting for propagation");
        let clock = self.clock.clone();
        let cancel = self.cancel.clone();
        let res = cancellable(&cancel, async move {
            clock.sleep(duration).await;
            Ok(())
        })
        .await;

        match res {
            Ok(()) => Ok(()),
            Err(cause) => self.fail(step, cause),
        }
    }

    /// Calls `notifyRewardAmounts` once the funding is confirmed on-chain.
    ///
    /// # Errors
    ///
    /// Fails with `DeployerError::NotFunded` without touching the chain if the
    /// run has not funded the pool yet, and with the same error if the funded
    /// balance is lower than what this run transferred.
    pub async fn activate_rewards(
        &mut self,
        factory: &FactoryHandle,
    ) -> Result<TxReceipt, StepError> {
        let step = Step::ActivateRewards;
        let (record, funded) = match &self.state {
            DeploymentState::Funded {
                factory: f,
                record,
                funded,
            } if f == factory => (*record, *funded),
            DeploymentState::Funded { .. } => return Err(self.out_of_order(step)),
            _ => {
                let expected = self
                    .params
                    .funding_amount(self.configs.funding_multiple)
                    .unwrap_or_else(|_| self.params.reward_amount());
                return Err(StepError::new(
                    step,
                    DeployerError::NotFunded {
                        expected,
                        actual: U256::ZERO,
                    },
                ));
            }
        };

        let token = self.params.reward_token();
        let target = self.funding_target(factory, &record);
        let cancel = self.cancel.clone();

        let balance = match cancellable(&cancel, self.env.token_balance(token, target)).await {
            Ok(balance) => balance,
            Err(cause) => return self.fail(step, cause),
        };
        if balance < funded {
            return self.fail(
                step,
                DeployerError::NotFunded {
                    expected: funded,
                    actual: balance,
                },
            );
        }

        tracing::info!(factory = %factory.address, %balance, "activating rewards");
        let call = ContractCall::new(&IStakingRewardsFactory::notifyRewardAmountsCall {});
        match cancellable(&cancel, self.env.send(factory.address, call)).await {
            Ok(receipt) => {
                self.state = DeploymentState::Activated {
                    factory: *factory,
                    record,
                    activation_tx: receipt.tx_hash,
                };
                Ok(receipt)
            }
            Err(cause) => self.fail(step, cause),
        }
    }

    fn funding_target(&self, factory: &FactoryHandle, record: &StakingRewardsRecord) -> Address {
        match self.configs.funding_target {
            FundingTarget::StakingRewards => record.address,
            FundingTarget::Factory => factory.address,
        }
    }

    fn fail<T>(&mut self, step: Step, cause: DeployerError) -> Result<T, StepError> {
        tracing::error!(%step, error = %cause, "deployment step failed");
        self.state.fail(step, cause.clone());
        Err(StepError::new(step, cause))
    }

    // Leaves the state untouched: nothing was attempted.
    fn out_of_order(&self, step: Step) -> StepError {
        StepError::new(
            step,
            DeployerError::StepOutOfOrder(format!(
                "{} cannot run while the deployment is {}",
                step, self.state
            )),
        )
    }
}

async fn cancellable<T>(
    cancel: &CancellationToken,
    fut: impl Future<Output = Result<T, DeployerError>>,
) -> Result<T, DeployerError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DeployerError::Cancelled),
        res = fut => res,
    }
}
