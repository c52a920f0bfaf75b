use alloy::{
    primitives::Bytes,
    sol_types::{SolCall, SolValue},
};
use staking_deployer::{
    mock::{mock_clock, mock_env, ChainCall, FakeClock, MockChainClient},
    Address, Contract, DeployerError, DeploymentParameters, DeploymentState, FundingTarget,
    Guard, IStakingRewardsFactory, Orchestrator, OrchestratorConfigs, Step, StepError, U256,
};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

const FACTORY_CODE: &[u8] = &[0x60, 0x80, 0x60, 0x40];

fn gin() -> Address {
    Address::repeat_byte(0xce)
}

fn e18(n: u64) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(18))
}

fn gin_params() -> DeploymentParameters {
    DeploymentParameters::new(gin(), e18(86_400), 86_400, 600, 600, 2)
}

fn orchestrator(client: &MockChainClient, params: DeploymentParameters) -> Orchestrator {
    Orchestrator::new(
        mock_env(client.clone()),
        Contract::from_bytecode(
            "GinLockedStakingRewardsFactory",
            Bytes::from_static(FACTORY_CODE),
        ),
        params,
        OrchestratorConfigs::default(),
    )
    .with_clock(Arc::new(mock_clock(client)))
}

fn activation_sends(client: &MockChainClient) -> usize {
    client
        .calls()
        .iter()
        .filter(|c| {
            matches!(c, ChainCall::Send { method, .. } if *method == "notifyRewardAmounts()")
        })
        .count()
}

#[tokio::test]
async fn full_run_issues_the_exact_call_sequence() {
    let client = MockChainClient::new().with_deployer_balance(gin(), e18(1_000_000));
    let deployer = client.deployer();
    let mut orchestrator = orchestrator(&client, gin_params());

    let summary = orchestrator.run().await.unwrap();

    let factory = MockChainClient::factory_address_at(0);
    let staking_rewards = MockChainClient::staking_rewards_address(factory, 0);
    assert_eq!(summary.factory, factory);
    assert_eq!(summary.staking_rewards, staking_rewards);

    let mut code = FACTORY_CODE.to_vec();
    code.extend_from_slice(&gin().abi_encode());
    let setup = gin_params().setup_call();

    assert_eq!(
        client.calls(),
        vec![
            ChainCall::Deploy { code: code.into() },
            ChainCall::Send {
                to: factory,
                method: "deploy(address,uint256,uint256,uint256,uint256,uint256)",
                calldata: setup.abi_encode().into(),
            },
            ChainCall::Call {
                to: factory,
                method: "stakingRewardsInfoList(uint256)",
            },
            ChainCall::TokenBalance {
                token: gin(),
                owner: deployer,
            },
            ChainCall::TransferToken {
                token: gin(),
                to: staking_rewards,
                amount: e18(259_200),
            },
            ChainCall::Sleep(Duration::from_secs(3)),
            ChainCall::TokenBalance {
                token: gin(),
                owner: staking_rewards,
            },
            ChainCall::Send {
                to: factory,
                method: "notifyRewardAmounts()",
                calldata: IStakingRewardsFactory::notifyRewardAmountsCall {}
                    .abi_encode()
                    .into(),
            },
        ]
    );

    assert_eq!(client.balance_of(gin(), staking_rewards), e18(259_200));
    assert_eq!(client.balance_of(gin(), deployer), e18(1_000_000 - 259_200));
    assert!(matches!(orchestrator.state(), DeploymentState::Activated { .. }));
}

#[tokio::test]
async fn insufficient_balance_stops_before_transfer_and_activation() {
    let client = MockChainClient::new().with_deployer_balance(gin(), e18(100_000));
    let mut orchestrator = orchestrator(&client, gin_params());

    let err = orchestrator.run().await.unwrap_err();

    assert_eq!(
        err,
        StepError::new(
            Step::FundStakingRewards,
            DeployerError::InsufficientBalance {
                required: e18(259_200),
                available: e18(100_000),
            }
        )
    );
    let calls = client.calls();
    assert!(!calls.iter().any(|c| matches!(c, ChainCall::TransferToken { .. })));
    assert_eq!(activation_sends(&client), 0);

    match orchestrator.state() {
        DeploymentState::Failed { step, last, .. } => {
            assert_eq!(*step, Step::FundStakingRewards);
            assert_eq!(last.name(), "record_read");
        }
        other => panic!("unexpected state {other}"),
    }
}

#[tokio::test]
async fn rejected_transfer_fails_the_funding_step() {
    // the balance check passes, the token contract still refuses the transfer
    let refusal = DeployerError::InsufficientBalance {
        required: e18(259_200),
        available: e18(1),
    };
    let client = MockChainClient::new()
        .with_deployer_balance(gin(), e18(1_000_000))
        .with_transfer_result(Err(refusal.clone()));
    let mut orchestrator = orchestrator(&client, gin_params());

    let err = orchestrator.run().await.unwrap_err();

    assert_eq!(err, StepError::new(Step::FundStakingRewards, refusal));
    assert!(client
        .calls()
        .iter()
        .any(|c| matches!(c, ChainCall::TransferToken { .. })));
    assert_eq!(activation_sends(&client), 0);
    match orchestrator.state() {
        DeploymentState::Failed { step, last, .. } => {
            assert_eq!(*step, Step::FundStakingRewards);
            assert_eq!(last.name(), "record_read");
        }
        other => panic!("unexpected state {other}"),
    }
}

#[tokio::test]
async fn independent_runs_create_independent_farms() {
    let a = MockChainClient::new().with_deployer_balance(gin(), e18(1_000_000));
    let b = MockChainClient::new().with_deployer_balance(gin(), e18(1_000_000));

    let first = orchestrator(&a, gin_params()).run().await.unwrap();
    let second = orchestrator(&b, gin_params()).run().await.unwrap();

    // fresh chains see the same pipeline, call for call
    assert_eq!(a.calls(), b.calls());
    assert_eq!(a.staking_rewards_count(first.factory), 1);
    assert_eq!(b.staking_rewards_count(second.factory), 1);
    assert_eq!(a.balance_of(gin(), first.staking_rewards), e18(259_200));
    assert_eq!(b.balance_of(gin(), second.staking_rewards), e18(259_200));
}

#[tokio::test]
async fn invalid_parameters_never_touch_the_chain() {
    let cases = [
        DeploymentParameters::new(gin(), U256::ZERO, 86_400, 600, 600, 2),
        DeploymentParameters::new(gin(), e18(86_400), 0, 600, 600, 2),
    ];

    for params in cases {
        let client = MockChainClient::new().with_deployer_balance(gin(), e18(1_000_000));
        let mut orchestrator = orchestrator(&client, params);

        let err = orchestrator.run().await.unwrap_err();

        assert_eq!(err.step, Step::ValidateParameters);
        assert!(matches!(err.cause, DeployerError::InvalidParameters(_)));
        assert!(client.calls().is_empty());
    }
}

#[tokio::test]
async fn activation_before_funding_is_refused_without_chain_calls() {
    let client = MockChainClient::new().with_deployer_balance(gin(), e18(1_000_000));
    let mut orchestrator = orchestrator(&client, gin_params());
    let factory = orchestrator.deploy_factory(gin()).await.unwrap();
    let calls_before = client.calls().len();

    let err = orchestrator.activate_rewards(&factory).await.unwrap_err();

    assert_eq!(
        err.cause,
        DeployerError::NotFunded {
            expected: e18(259_200),
            actual: U256::ZERO,
        }
    );
    assert_eq!(client.calls().len(), calls_before);
    assert_eq!(orchestrator.state().name(), "factory_deployed");
}

#[tokio::test]
async fn reading_past_the_last_record_fails() {
    let client = MockChainClient::new().with_deployer_balance(gin(), e18(1_000_000));
    let mut orchestrator = orchestrator(&client, gin_params());
    let factory = orchestrator.deploy_factory(gin()).await.unwrap();
    orchestrator
        .initialize_factory(&factory, &gin_params())
        .await
        .unwrap();

    let record = orchestrator
        .read_staking_rewards_record(&factory, 0)
        .await
        .unwrap();
    assert_eq!(
        record.address,
        MockChainClient::staking_rewards_address(factory.address, 0)
    );

    let err = orchestrator
        .read_staking_rewards_record(&factory, 1)
        .await
        .unwrap_err();
    assert_eq!(err.cause, DeployerError::RecordNotFound(1));
}

#[tokio::test]
async fn setup_call_carries_the_integer_reward_amount() {
    let client = MockChainClient::new().with_deployer_balance(gin(), e18(1_000_000));
    orchestrator(&client, gin_params()).run().await.unwrap();

    let calldata = client
        .calls()
        .into_iter()
        .find_map(|c| match c {
            ChainCall::Send { method, calldata, .. } if method.starts_with("deploy(") => {
                Some(calldata)
            }
            _ => None,
        })
        .unwrap();
    let setup = IStakingRewardsFactory::deployCall::abi_decode(&calldata).unwrap();

    assert_eq!(
        setup.rewardAmount,
        U256::from_str_radix("86400000000000000000000", 10).unwrap()
    );
    assert_eq!(setup.boostMultiplier, U256::from(2));
}

#[tokio::test]
async fn rejected_activation_is_reported_and_not_retried() {
    let client = MockChainClient::new()
        .with_deployer_balance(gin(), e18(1_000_000))
        .with_send_result(
            "notifyRewardAmounts()",
            Err(DeployerError::TransactionRejected("execution reverted".to_string())),
        );
    let mut orchestrator = orchestrator(&client, gin_params());

    let err = orchestrator.run().await.unwrap_err();

    assert_eq!(err.step, Step::ActivateRewards);
    assert_eq!(activation_sends(&client), 1);
}

#[tokio::test]
async fn timed_out_setup_requires_confirmation_to_resume() {
    let client = MockChainClient::new()
        .with_deployer_balance(gin(), e18(1_000_000))
        .with_send_result(
            IStakingRewardsFactory::deployCall::SIGNATURE,
            Err(DeployerError::Timeout("no receipt".to_string())),
        );
    let mut first = orchestrator(&client, gin_params());
    let err = first.run().await.unwrap_err();
    assert_eq!(err.step, Step::InitializeFactory);

    let saved: DeploymentState =
        serde_json::from_str(&serde_json::to_string(first.state()).unwrap()).unwrap();

    let refused = orchestrator(&client, gin_params()).resume(saved.clone(), false);
    assert!(matches!(refused, Err(DeployerError::UnconfirmedRetry(_))));

    let resumed = orchestrator(&client, gin_params())
        .resume(saved, true)
        .unwrap();
    assert_eq!(resumed.state().name(), "factory_deployed");
}

#[tokio::test]
async fn cancelling_the_propagation_wait_stops_before_activation() {
    let client = MockChainClient::new().with_deployer_balance(gin(), e18(1_000_000));
    let cancel = CancellationToken::new();
    let mut orchestrator = orchestrator(&client, gin_params())
        .with_clock(Arc::new(FakeClock::cancelling(client.log(), cancel.clone())))
        .with_cancellation(cancel);

    let err = orchestrator.run().await.unwrap_err();

    assert_eq!(
        err,
        StepError::new(Step::WaitForPropagation, DeployerError::Cancelled)
    );
    assert_eq!(activation_sends(&client), 0);
    match orchestrator.state() {
        DeploymentState::Failed { last, .. } => assert_eq!(last.name(), "funded"),
        other => panic!("unexpected state {other}"),
    }
}

#[tokio::test]
async fn guard_caps_the_number_of_transactions() {
    let client = MockChainClient::new().with_deployer_balance(gin(), e18(1_000_000));
    let mut env = mock_env(client.clone());
    env.add_guard(Guard::NumberOfAllowedCalls(2));
    let mut orchestrator = Orchestrator::new(
        env,
        Contract::from_bytecode("F", Bytes::from_static(FACTORY_CODE)),
        gin_params(),
        OrchestratorConfigs {
            funding_target: FundingTarget::Factory,
            ..OrchestratorConfigs::default()
        },
    )
    .with_clock(Arc::new(mock_clock(&client)));

    let err = orchestrator.run().await.unwrap_err();

    assert_eq!(err.step, Step::FundStakingRewards);
    assert!(matches!(err.cause, DeployerError::Unauthorized(_)));
    assert_eq!(client.calls().iter().filter(|c| c.is_submission()).count(), 2);
}

#[tokio::test(start_paused = true)]
async fn unresponsive_node_times_out_the_factory_deployment() {
    let client = MockChainClient::new().with_latency(Duration::from_secs(600));
    let mut orchestrator = orchestrator(&client, gin_params());

    let err = orchestrator.run().await.unwrap_err();

    assert_eq!(err.step, Step::DeployFactory);
    assert!(matches!(err.cause, DeployerError::Timeout(_)));
    assert!(matches!(
        orchestrator.state(),
        DeploymentState::Failed { last, .. } if **last == DeploymentState::NotStarted
    ));
}
