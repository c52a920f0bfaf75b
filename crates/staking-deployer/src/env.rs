use crate::{
    error::DeployerError,
    guard::Guard,
    response::TxReceipt,
    rpc::{ChainClient, ContractCall, ExternalChainClient},
    Signer,
};
use alloy::primitives::{Address, Bytes, U256};
use std::{future::Future, sync::Arc, time::Duration};

pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_REQUIRED_CONFIRMATIONS: u64 = 1;

/// Extra time the outer bound allows on top of the confirmation timeout, so
/// submission and gas estimation do not eat into the receipt wait.
pub const SUBMISSION_HEADROOM: Duration = Duration::from_secs(15);

/// Target network of a deployment run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnvConfigs {
    /// Name the operator selected the network by, e.g. `boba_mainnet`
    pub network: String,
    pub rpc_url: String,
    /// Chain id the node must report before anything is sent
    pub chain_id: u64,
    pub required_confirmations: u64,
    /// How long a submitted transaction may take to confirm
    pub confirmation_timeout: Duration,
}

/// Connection to the target network plus the limits applied to it.
#[derive(Clone)]
pub struct Env {
    pub(crate) chain_client: Arc<dyn ChainClient>,
    pub(crate) configs: EnvConfigs,
    pub(crate) guards: Vec<Guard>,
}

impl Env {
    /// Connects to the configured endpoint and checks the node is on the
    /// expected chain.
    pub async fn connect(configs: EnvConfigs, signer: &Signer) -> Result<Self, DeployerError> {
        let client = ExternalChainClient::connect(
            &configs.rpc_url,
            signer,
            configs.required_confirmations,
            configs.confirmation_timeout,
        )
        .await?;

        let env = Self::with_client(configs, Arc::new(client));
        env.verify_chain_id().await?;
        Ok(env)
    }

    /// Wraps an already constructed chain client, e.g. a simulated one.
    pub fn with_client(configs: EnvConfigs, chain_client: Arc<dyn ChainClient>) -> Self {
        Self {
            chain_client,
            configs,
            guards: Vec::new(),
        }
    }

    pub fn configs(&self) -> &EnvConfigs {
        &self.configs
    }

    pub fn network(&self) -> &str {
        &self.configs.network
    }

    pub fn deployer(&self) -> Address {
        self.chain_client.deployer()
    }

    pub fn add_guard(&mut self, guard: Guard) {
        self.guards.push(guard);
    }

    pub async fn verify_chain_id(&self) -> Result<(), DeployerError> {
        let actual = self.bounded("eth_chainId", self.chain_client.chain_id()).await?;
        if actual != self.configs.chain_id {
            return Err(DeployerError::ChainIdMismatch {
                expected: self.configs.chain_id,
                actual,
            });
        }
        Ok(())
    }

    pub async fn deploy(&mut self, code: Bytes) -> Result<TxReceipt, DeployerError> {
        self.authorize()?;
        self.bounded("contract creation", self.chain_client.deploy(code)).await
    }

    pub async fn call(&self, to: Address, call: ContractCall) -> Result<Bytes, DeployerError> {
        let method = call.method;
        self.bounded(method, self.chain_client.call(to, call)).await
    }

    pub async fn send(
        &mut self,
        to: Address,
        call: ContractCall,
    ) -> Result<TxReceipt, DeployerError> {
        self.authorize()?;
        let method = call.method;
        self.bounded(method, self.chain_client.send(to, call)).await
    }

    pub async fn token_balance(
        &self,
        token: Address,
        owner: Address,
    ) -> Result<U256, DeployerError> {
        self.bounded("balanceOf", self.chain_client.token_balance(token, owner)).await
    }

    pub async fn transfer_token(
        &mut self,
        token: Address,
        to: Address,
        amount: U256,
    ) -> Result<TxReceipt, DeployerError> {
        self.authorize()?;
        self.bounded("transfer", self.chain_client.transfer_token(token, to, amount)).await
    }

    /// Consumes one submission from every guard, failing if any is exhausted.
    fn authorize(&mut self) -> Result<(), DeployerError> {
        if !self.guards.iter().all(Guard::check) {
            return Err(DeployerError::Unauthorized(
                "The transaction didn't pass one or more guards".to_string(),
            ));
        }
        self.guards.iter_mut().for_each(Guard::update);
        Ok(())
    }

    /// Upper bound for a whole client call. The client's own confirmation
    /// wait expires first and reports the transaction hash.
    pub fn call_timeout(&self) -> Duration {
        self.configs
            .confirmation_timeout
            .saturating_add(SUBMISSION_HEADROOM)
    }

    async fn bounded<T>(
        &self,
        what: &str,
        fut: impl Future<Output = Result<T, DeployerError>>,
    ) -> Result<T, DeployerError> {
        let timeout = self.call_timeout();
        tokio::time::timeout(timeout, fut).await.map_err(|_| {
            DeployerError::Timeout(format!("{} did not complete within {:?}", what, timeout))
        })?
    }
}
