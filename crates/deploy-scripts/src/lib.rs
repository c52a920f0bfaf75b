//! Fixed parameter sets for the farms deployed by the scripts in `src/scripts`.
use staking_deployer::{
    config::{
        DEFAULT_BOOST_MULTIPLIER, DEFAULT_COOLDOWN_PERIOD, DEFAULT_LOCK_PERIOD,
        DEFAULT_REWARD_AMOUNT, DEFAULT_REWARD_DURATION, DEFAULT_REWARD_TOKEN,
    },
    parse_amount, DeployerError, DeploymentParameters, FundingTarget, OrchestratorConfigs,
    DEFAULT_FUNDING_MULTIPLE, DEFAULT_PROPAGATION_DELAY,
};

/// Network the GIN farm lives on.
pub const GIN_FARM_NETWORK: &str = "boba_mainnet";

/// One day of GIN rewards per period, 10 minute lock and cooldown, 2x boost.
pub fn gin_farm_parameters() -> Result<DeploymentParameters, DeployerError> {
    Ok(DeploymentParameters::new(
        DEFAULT_REWARD_TOKEN,
        parse_amount(DEFAULT_REWARD_AMOUNT)?,
        DEFAULT_REWARD_DURATION,
        DEFAULT_LOCK_PERIOD,
        DEFAULT_COOLDOWN_PERIOD,
        DEFAULT_BOOST_MULTIPLIER,
    ))
}

/// Three periods are funded up front, into the factory.
pub fn gin_farm_configs() -> OrchestratorConfigs {
    OrchestratorConfigs {
        funding_multiple: DEFAULT_FUNDING_MULTIPLE,
        funding_target: FundingTarget::Factory,
        record_index: 0,
        propagation_delay: DEFAULT_PROPAGATION_DELAY,
    }
}

#[cfg(test)]
mod test;
