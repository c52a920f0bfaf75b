use deploy_scripts::{gin_farm_configs, gin_farm_parameters, GIN_FARM_NETWORK};
use dotenv::dotenv;
use staking_deployer::{
    config::{self, NetworkConfig, DEFAULT_FACTORY_ARTIFACT},
    logging, Contract, DeployerError, Env, Guard, Orchestrator, Signer,
};
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    logging::init_logging(logging::DEFAULT_LOG_FILTER);

    // Loads the deployer key from the .env file
    let signer = Signer::from_private_key(&config::private_key_from_env()?)?;

    let network = NetworkConfig::preset(GIN_FARM_NETWORK).ok_or_else(|| {
        DeployerError::InvalidConfig(format!("unknown network {}", GIN_FARM_NETWORK))
    })?;
    let mut env = Env::connect(network.env_configs(GIN_FARM_NETWORK), &signer).await?;

    // deploy, setup, transfer and activation
    env.add_guard(Guard::NumberOfAllowedCalls(4));

    // Path to the compiled factory, relative to the contracts project
    let factory = Contract::new(DEFAULT_FACTORY_ARTIFACT, None)?;

    let params = gin_farm_parameters()?;
    let configs = gin_farm_configs();
    let funding = params.funding_amount(configs.funding_multiple)?;
    let delay = configs.propagation_delay;
    let mut orchestrator = Orchestrator::new(env, factory, params.clone(), configs);

    let handle = orchestrator.deploy_factory(params.reward_token()).await?;
    let setup = orchestrator.initialize_factory(&handle, &params).await?;
    tracing::debug!(?setup, "setup receipt");

    let record = orchestrator.read_staking_rewards_record(&handle, 0).await?;
    println!("Factory: {}", handle.address);
    println!("Staking Rewards: {}", record.address);

    orchestrator.fund_staking_rewards(&record, funding).await?;
    orchestrator.wait_for_propagation(delay).await?;
    orchestrator.activate_rewards(&handle).await?;

    println!("Farm Started");
    Ok(())
}
