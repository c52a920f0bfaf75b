use crate::contract::IStakingRewardsFactory;
use crate::error::DeployerError;
use crate::response::TxReceipt;
use crate::rpc::{ChainClient, ContractCall};
use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol_types::{SolCall, SolValue};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{mock_signer, CallLog, ChainCall};

/// Chain id reported by default, matching the `local` network preset.
pub const MOCK_CHAIN_ID: u64 = 31337;

struct StakingRewardsInfo {
    address: Address,
    reward_amount: U256,
}

struct MockChain {
    chain_id: u64,
    deployer: Address,
    latency: Option<Duration>,
    nonce: u64,
    factories: Vec<Address>,
    records: HashMap<Address, Vec<StakingRewardsInfo>>,
    next_records: Vec<Address>,
    balances: HashMap<(Address, Address), U256>,
    deploy_result: Option<Result<TxReceipt, DeployerError>>,
    send_results: HashMap<&'static str, Result<TxReceipt, DeployerError>>,
    transfer_result: Option<Result<TxReceipt, DeployerError>>,
}

/// In-memory chain that understands the factory and ERC-20 calls made by a
/// deployment.
///
/// Every client call is appended to a shared log. Results can be overridden
/// per operation to simulate node failures.
#[derive(Clone)]
pub struct MockChainClient {
    chain: Arc<Mutex<MockChain>>,
    log: CallLog,
}

impl Default for MockChainClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockChainClient {
    pub fn new() -> Self {
        Self {
            chain: Arc::new(Mutex::new(MockChain {
                chain_id: MOCK_CHAIN_ID,
                deployer: mock_signer().address(),
                latency: None,
                nonce: 0,
                factories: Vec::new(),
                records: HashMap::new(),
                next_records: Vec::new(),
                balances: HashMap::new(),
                deploy_result: None,
                send_results: HashMap::new(),
                transfer_result: None,
            })),
            log: CallLog::default(),
        }
    }

    pub fn with_chain_id(self, chain_id: u64) -> Self {
        self.chain.lock().unwrap().chain_id = chain_id;
        self
    }

    /// Delays every response, e.g. to trigger timeouts.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.chain.lock().unwrap().latency = Some(latency);
        self
    }

    pub fn with_balance(self, token: Address, owner: Address, amount: U256) -> Self {
        self.chain
            .lock()
            .unwrap()
            .balances
            .insert((token, owner), amount);
        self
    }

    pub fn with_deployer_balance(self, token: Address, amount: U256) -> Self {
        let deployer = self.chain.lock().unwrap().deployer;
        self.with_balance(token, deployer, amount)
    }

    /// Address given to the next pool created by a setup call. Queued in order.
    pub fn with_staking_rewards(self, address: Address) -> Self {
        self.chain.lock().unwrap().next_records.push(address);
        self
    }

    pub fn with_deploy_result(self, result: Result<TxReceipt, DeployerError>) -> Self {
        self.chain.lock().unwrap().deploy_result = Some(result);
        self
    }

    /// Overrides the outcome of every send of `method`, e.g. `notifyRewardAmounts()`.
    pub fn with_send_result(
        self,
        method: &'static str,
        result: Result<TxReceipt, DeployerError>,
    ) -> Self {
        self.chain
            .lock()
            .unwrap()
            .send_results
            .insert(method, result);
        self
    }

    pub fn with_transfer_result(self, result: Result<TxReceipt, DeployerError>) -> Self {
        self.chain.lock().unwrap().transfer_result = Some(result);
        self
    }

    pub fn calls(&self) -> Vec<ChainCall> {
        self.log.entries()
    }

    pub fn log(&self) -> CallLog {
        self.log.clone()
    }

    pub fn deployer(&self) -> Address {
        self.chain.lock().unwrap().deployer
    }

    /// Address of the first contract this client creates.
    pub fn factory_address(&self) -> Address {
        Self::factory_address_at(0)
    }

    /// Address of the `n`-th contract this client creates.
    pub fn factory_address_at(n: usize) -> Address {
        let mut bytes = [0xfa; 20];
        bytes[19] = n as u8;
        Address::from(bytes)
    }

    /// Default address of pool `index` created by `factory`.
    pub fn staking_rewards_address(factory: Address, index: usize) -> Address {
        let mut bytes = [0xaa; 20];
        bytes[18] = factory[19];
        bytes[19] = index as u8;
        Address::from(bytes)
    }

    pub fn balance_of(&self, token: Address, owner: Address) -> U256 {
        self.chain
            .lock()
            .unwrap()
            .balances
            .get(&(token, owner))
            .copied()
            .unwrap_or_default()
    }

    pub fn staking_rewards_count(&self, factory: Address) -> usize {
        self.chain
            .lock()
            .unwrap()
            .records
            .get(&factory)
            .map_or(0, Vec::len)
    }

    async fn respond<T>(&self, result: Result<T, DeployerError>) -> Result<T, DeployerError> {
        let latency = self.chain.lock().unwrap().latency;
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        result
    }
}

impl MockChain {
    fn receipt(&mut self) -> TxReceipt {
        self.nonce += 1;
        TxReceipt::new(B256::with_last_byte(self.nonce as u8)).with_block_number(self.nonce)
    }

    fn deploy(&mut self) -> Result<TxReceipt, DeployerError> {
        if let Some(result) = self.deploy_result.clone() {
            return result;
        }
        let address = MockChainClient::factory_address_at(self.factories.len());
        self.factories.push(address);
        Ok(self.receipt().with_contract_address(address))
    }

    fn send(&mut self, to: Address, call: &ContractCall) -> Result<TxReceipt, DeployerError> {
        if let Some(result) = self.send_results.get(call.method) {
            return result.clone();
        }
        if call.method == IStakingRewardsFactory::deployCall::SIGNATURE {
            let setup = IStakingRewardsFactory::deployCall::abi_decode(&call.calldata)
                .map_err(|e| DeployerError::TransactionRejected(e.to_string()))?;
            let index = self.records.get(&to).map_or(0, Vec::len);
            let address = if self.next_records.is_empty() {
                MockChainClient::staking_rewards_address(to, index)
            } else {
                self.next_records.remove(0)
            };
            self.records.entry(to).or_default().push(StakingRewardsInfo {
                address,
                reward_amount: setup.rewardAmount,
            });
        }
        Ok(self.receipt())
    }

    fn call(&self, to: Address, call: &ContractCall) -> Result<Bytes, DeployerError> {
        let reverted =
            || DeployerError::CallReverted(format!("{}: execution reverted", call.method));
        if call.method != IStakingRewardsFactory::stakingRewardsInfoListCall::SIGNATURE {
            return Err(reverted());
        }
        let request =
            IStakingRewardsFactory::stakingRewardsInfoListCall::abi_decode(&call.calldata)
                .map_err(|_| reverted())?;
        let index = usize::try_from(request.index).map_err(|_| reverted())?;

        let info = self
            .records
            .get(&to)
            .and_then(|records| records.get(index))
            .ok_or_else(reverted)?;
        Ok((info.address, info.reward_amount).abi_encode_params().into())
    }

    fn transfer(
        &mut self,
        token: Address,
        to: Address,
        amount: U256,
    ) -> Result<TxReceipt, DeployerError> {
        if let Some(result) = self.transfer_result.clone() {
            return result;
        }
        let from = self.deployer;
        let available = self
            .balances
            .get(&(token, from))
            .copied()
            .unwrap_or_default();
        if available < amount {
            return Err(DeployerError::TransactionRejected(
                "ERC20: transfer amount exceeds balance".to_string(),
            ));
        }
        self.balances.insert((token, from), available - amount);
        *self.balances.entry((token, to)).or_default() += amount;
        Ok(self.receipt())
    }
}

#[async_trait]
impl ChainClient for MockChainClient {
    fn deployer(&self) -> Address {
        self.chain.lock().unwrap().deployer
    }

    async fn chain_id(&self) -> Result<u64, DeployerError> {
        let chain_id = self.chain.lock().unwrap().chain_id;
        self.respond(Ok(chain_id)).await
    }

    async fn deploy(&self, code: Bytes) -> Result<TxReceipt, DeployerError> {
        self.log.push(ChainCall::Deploy { code });
        let result = self.chain.lock().unwrap().deploy();
        self.respond(result).await
    }

    async fn call(&self, to: Address, call: ContractCall) -> Result<Bytes, DeployerError> {
        self.log.push(ChainCall::Call {
            to,
            method: call.method,
        });
        let result = self.chain.lock().unwrap().call(to, &call);
        self.respond(result).await
    }

    async fn send(&self, to: Address, call: ContractCall) -> Result<TxReceipt, DeployerError> {
        let result = self.chain.lock().unwrap().send(to, &call);
        self.log.push(ChainCall::Send {
            to,
            method: call.method,
            calldata: call.calldata,
        });
        self.respond(result).await
    }

    async fn token_balance(
        &self,
        token: Address,
        owner: Address,
    ) -> Result<U256, DeployerError> {
        self.log.push(ChainCall::TokenBalance { token, owner });
        let balance = self.balance_of(token, owner);
        self.respond(Ok(balance)).await
    }

    async fn transfer_token(
        &self,
        token: Address,
        to: Address,
        amount: U256,
    ) -> Result<TxReceipt, DeployerError> {
        self.log.push(ChainCall::TransferToken { token, to, amount });
        let result = self.chain.lock().unwrap().transfer(token, to, amount);
        self.respond(result).await
    }
}
