use super::*;
use staking_deployer::{
    mock::{mock_clock, mock_env, MockChainClient},
    Address, Contract, Orchestrator, U256,
};
use std::sync::Arc;

fn gin_units(n: u64) -> U256 {
    U256::from(n) * U256::from(10u64).pow(U256::from(18))
}

#[test]
fn gin_farm_parameters_are_valid() {
    let params = gin_farm_parameters().unwrap();

    assert!(params.validate().is_ok());
    assert_eq!(params.reward_amount(), gin_units(86_400));
    assert_eq!(params.reward_duration(), 86_400);
    assert_eq!(params.boost_multiplier(), 2);
    assert_eq!(
        params.funding_amount(gin_farm_configs().funding_multiple).unwrap(),
        gin_units(259_200)
    );
}

#[tokio::test]
async fn gin_farm_funds_the_factory() {
    let params = gin_farm_parameters().unwrap();
    let client =
        MockChainClient::new().with_deployer_balance(params.reward_token(), gin_units(300_000));
    let mut orchestrator = Orchestrator::new(
        mock_env(client.clone()),
        Contract::from_bytecode("GinLockedStakingRewardsFactory", vec![0x60, 0x80].into()),
        params.clone(),
        gin_farm_configs(),
    )
    .with_clock(Arc::new(mock_clock(&client)));

    let summary = orchestrator.run().await.unwrap();

    assert_eq!(
        client.balance_of(params.reward_token(), summary.factory),
        gin_units(259_200)
    );
    assert_eq!(
        client.balance_of(params.reward_token(), summary.staking_rewards),
        U256::ZERO
    );
    assert_ne!(summary.staking_rewards, Address::ZERO);
}
