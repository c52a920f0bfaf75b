//! # Chain Client
//!
//! This module provides the chain client used to talk to an Ethereum-compatible
//! node. It defines a trait for the handful of operations the deployment needs
//! and a concrete implementation backed by an alloy provider with the deployer
//! wallet attached.
//!
use crate::{contract::IERC20, error::DeployerError, response::TxReceipt, Signer};
use alloy::{
    network::{Ethereum, EthereumWallet, TransactionBuilder},
    primitives::{Address, Bytes, U256},
    providers::{
        DynProvider, PendingTransactionBuilder, PendingTransactionError, Provider,
        ProviderBuilder, WatchTxError,
    },
    rpc::types::TransactionRequest,
    sol_types::SolCall,
    transports::{RpcError, TransportError},
};
use std::time::Duration;

/// ABI-encoded contract call together with the signature it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCall {
    /// Solidity signature, e.g. `notifyRewardAmounts()`
    pub method: &'static str,
    /// Selector followed by the encoded arguments
    pub calldata: Bytes,
}

impl ContractCall {
    pub fn new<C: SolCall>(call: &C) -> Self {
        Self {
            method: C::SIGNATURE,
            calldata: call.abi_encode().into(),
        }
    }
}

/// Interface for the chain operations used by the deployment pipeline.
///
/// Every method that submits a transaction resolves only once the transaction
/// is confirmed, so callers can rely on its effects in the next step.
#[async_trait::async_trait]
pub trait ChainClient: Send + Sync {
    /// Address that signs and pays for every transaction.
    fn deployer(&self) -> Address;

    async fn chain_id(&self) -> Result<u64, DeployerError>;

    /// Submits a contract creation transaction.
    async fn deploy(&self, code: Bytes) -> Result<TxReceipt, DeployerError>;

    /// Executes a read-only call and returns the raw return data.
    async fn call(&self, to: Address, call: ContractCall) -> Result<Bytes, DeployerError>;

    /// Submits a state-changing call.
    async fn send(&self, to: Address, call: ContractCall) -> Result<TxReceipt, DeployerError>;

    async fn token_balance(&self, token: Address, owner: Address)
        -> Result<U256, DeployerError>;

    async fn transfer_token(
        &self,
        token: Address,
        to: Address,
        amount: U256,
    ) -> Result<TxReceipt, DeployerError>;
}

/// Chain client connected to a JSON-RPC endpoint over HTTP or WebSocket.
pub struct ExternalChainClient {
    provider: DynProvider,
    deployer: Address,
    required_confirmations: u64,
    confirmation_timeout: Duration,
}

impl ExternalChainClient {
    /// Connects to the node at `url` with the signer's wallet attached.
    ///
    /// # Errors
    ///
    /// Returns `DeployerError::ChainUnavailable` if the transport cannot be established.
    pub async fn connect(
        url: &str,
        signer: &Signer,
        required_confirmations: u64,
        confirmation_timeout: Duration,
    ) -> Result<Self, DeployerError> {
        let wallet = EthereumWallet::from(signer.inner().clone());
        let provider = ProviderBuilder::new()
            .wallet(wallet)
            .connect(url)
            .await
            .map_err(|e| {
                DeployerError::ChainUnavailable(format!("Failed to connect to {}: {}", url, e))
            })?
            .erased();

        Ok(Self {
            provider,
            deployer: signer.address(),
            required_confirmations,
            confirmation_timeout,
        })
    }

    async fn submit(&self, tx: TransactionRequest) -> Result<TxReceipt, DeployerError> {
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .map_err(|e| send_error("Failed to send transaction", e))?;

        self.confirm(pending).await
    }

    async fn confirm(
        &self,
        pending: PendingTransactionBuilder<Ethereum>,
    ) -> Result<TxReceipt, DeployerError> {
        let tx_hash = *pending.tx_hash();
        tracing::debug!(%tx_hash, "waiting for confirmation");

        let receipt = pending
            .with_required_confirmations(self.required_confirmations)
            .with_timeout(Some(self.confirmation_timeout))
            .get_receipt()
            .await
            .map_err(|e| match e {
                PendingTransactionError::TxWatcher(WatchTxError::Timeout) => {
                    DeployerError::Timeout(format!(
                        "transaction {} not confirmed within {:?}",
                        tx_hash, self.confirmation_timeout
                    ))
                }
                other => DeployerError::ChainUnavailable(format!(
                    "Failed to fetch receipt for {}: {}",
                    tx_hash, other
                )),
            })?;

        if !receipt.status() {
            return Err(DeployerError::TransactionRejected(format!(
                "transaction {} reverted",
                tx_hash
            )));
        }

        Ok(TxReceipt {
            tx_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used,
            contract_address: receipt.contract_address,
        })
    }
}

/// Node error responses on submission mean the transaction was refused;
/// everything else is a transport problem.
fn send_error(context: &str, err: TransportError) -> DeployerError {
    match err {
        RpcError::ErrorResp(payload) => {
            DeployerError::TransactionRejected(format!("{}: {}", context, payload.message))
        }
        other => DeployerError::ChainUnavailable(format!("{}: {}", context, other)),
    }
}

fn call_error(context: &str, err: TransportError) -> DeployerError {
    match err {
        RpcError::ErrorResp(payload) => {
            DeployerError::CallReverted(format!("{}: {}", context, payload.message))
        }
        other => DeployerError::ChainUnavailable(format!("{}: {}", context, other)),
    }
}

#[async_trait::async_trait]
impl ChainClient for ExternalChainClient {
    fn deployer(&self) -> Address {
        self.deployer
    }

    async fn chain_id(&self) -> Result<u64, DeployerError> {
        self.provider
            .get_chain_id()
            .await
            .map_err(|e| DeployerError::ChainUnavailable(format!("Failed to get chain id: {}", e)))
    }

    async fn deploy(&self, code: Bytes) -> Result<TxReceipt, DeployerError> {
        let tx = TransactionRequest::default()
            .with_from(self.deployer)
            .with_deploy_code(code);
        self.submit(tx).await
    }

    async fn call(&self, to: Address, call: ContractCall) -> Result<Bytes, DeployerError> {
        let tx = TransactionRequest::default()
            .with_from(self.deployer)
            .with_to(to)
            .with_input(call.calldata);
        self.provider
            .call(tx)
            .await
            .map_err(|e| call_error(call.method, e))
    }

    async fn send(&self, to: Address, call: ContractCall) -> Result<TxReceipt, DeployerError> {
        let tx = TransactionRequest::default()
            .with_from(self.deployer)
            .with_to(to)
            .with_input(call.calldata);
        self.submit(tx).await
    }

    async fn token_balance(
        &self,
        token: Address,
        owner: Address,
    ) -> Result<U256, DeployerError> {
        let data = self
            .call(token, ContractCall::new(&IERC20::balanceOfCall { account: owner }))
            .await?;
        IERC20::balanceOfCall::abi_decode_returns(&data).map_err(|e| {
            DeployerError::CallReverted(format!("balanceOf returned malformed data: {}", e))
        })
    }

    async fn transfer_token(
        &self,
        token: Address,
        to: Address,
        amount: U256,
    ) -> Result<TxReceipt, DeployerError> {
        self.send(token, ContractCall::new(&IERC20::transferCall { to, amount }))
            .await
    }
}

#[cfg(test)]
pub mod test {
    use super::*;
    use crate::contract::IStakingRewardsFactory;
    use alloy::rpc::json_rpc::ErrorPayload;

    #[test]
    fn contract_call_keeps_signature_and_selector() {
        let call = ContractCall::new(&IStakingRewardsFactory::notifyRewardAmountsCall {});

        assert_eq!(call.method, "notifyRewardAmounts()");
        assert_eq!(
            call.calldata.as_ref(),
            IStakingRewardsFactory::notifyRewardAmountsCall::SELECTOR.as_slice()
        );
    }

    #[test]
    fn node_error_responses_are_rejections() {
        let err = send_error("send", RpcError::ErrorResp(ErrorPayload::internal_error()));
        assert!(matches!(err, DeployerError::TransactionRejected(_)));

        let err = call_error("call", RpcError::ErrorResp(ErrorPayload::internal_error()));
        assert!(matches!(err, DeployerError::CallReverted(_)));
    }

    #[test]
    fn transport_failures_are_unavailability() {
        let err = send_error("send", TransportError::local_usage_str("connection refused"));
        assert!(matches!(
            err,
            DeployerError::ChainUnavailable(msg) if msg.contains("connection refused")
        ));
    }

    #[tokio::test]
    async fn connect_to_unreachable_websocket_fails() {
        let signer = crate::mock::mock_signer();
        let res = ExternalChainClient::connect(
            "ws://127.0.0.1:1",
            &signer,
            1,
            Duration::from_secs(1),
        )
        .await;

        assert!(matches!(res, Err(DeployerError::ChainUnavailable(_))));
    }
}
