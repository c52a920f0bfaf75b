//! Deployment parameters of a staking rewards pool.
//!
//! Amounts are kept as `U256` base units end to end; configuration may spell
//! them in integer scientific notation (`86400e18`) which is expanded exactly.
use crate::{contract::IStakingRewardsFactory, error::DeployerError};
use alloy::primitives::{Address, U256};

/// Immutable parameter set passed to the factory's setup entrypoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentParameters {
    reward_token: Address,
    reward_amount: U256,
    reward_duration: u64,
    lock_period: u64,
    cooldown_period: u64,
    boost_multiplier: u64,
}

impl DeploymentParameters {
    /// Builds a parameter set. Nothing is checked here; see [`Self::validate`].
    ///
    /// # Parameters
    ///
    /// * `reward_token` - ERC-20 paid out as rewards (also the staking token)
    /// * `reward_amount` - Rewards per period, in token base units
    /// * `reward_duration` - Length of a reward period in seconds
    /// * `lock_period` - Seconds a stake stays locked
    /// * `cooldown_period` - Seconds between unstake request and withdrawal
    /// * `boost_multiplier` - Reward scaling factor for qualifying stakers
    pub fn new(
        reward_token: Address,
        reward_amount: U256,
        reward_duration: u64,
        lock_period: u64,
        cooldown_period: u64,
        boost_multiplier: u64,
    ) -> Self {
        Self {
            reward_token,
            reward_amount,
            reward_duration,
            lock_period,
            cooldown_period,
            boost_multiplier,
        }
    }

    pub fn reward_token(&self) -> Address {
        self.reward_token
    }

    pub fn reward_amount(&self) -> U256 {
        self.reward_amount
    }

    pub fn reward_duration(&self) -> u64 {
        self.reward_duration
    }

    pub fn lock_period(&self) -> u64 {
        self.lock_period
    }

    pub fn cooldown_period(&self) -> u64 {
        self.cooldown_period
    }

    pub fn boost_multiplier(&self) -> u64 {
        self.boost_multiplier
    }

    pub fn validate(&self) -> Result<(), DeployerError> {
        if self.reward_token.is_zero() {
            return Err(DeployerError::InvalidParameters(
                "reward token must not be the zero address".to_string(),
            ));
        }
        if self.reward_amount.is_zero() {
            return Err(DeployerError::InvalidParameters(
                "reward amount must be > 0".to_string(),
            ));
        }
        if self.reward_duration == 0 {
            return Err(DeployerError::InvalidParameters(
                "reward duration must be > 0".to_string(),
            ));
        }
        if self.boost_multiplier == 0 {
            return Err(DeployerError::InvalidParameters(
                "boost multiplier must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Total transferred to the pool: `multiple` periods worth of rewards.
    pub fn funding_amount(&self, multiple: u64) -> Result<U256, DeployerError> {
        if multiple == 0 {
            return Err(DeployerError::InvalidParameters(
                "funding multiple must be > 0".to_string(),
            ));
        }
        self.reward_amount
            .checked_mul(U256::from(multiple))
            .ok_or_else(|| {
                DeployerError::InvalidParameters(format!(
                    "funding {} x {} overflows uint256",
                    self.reward_amount, multiple
                ))
            })
    }

    /// Setup call with the six arguments in the factory's order: token,
    /// reward amount, reward duration, lock period, cooldown period, boost.
    pub fn setup_call(&self) -> IStakingRewardsFactory::deployCall {
        IStakingRewardsFactory::deployCall {
            stakingToken: self.reward_token,
            rewardAmount: self.reward_amount,
            rewardsDuration: U256::from(self.reward_duration),
            lockPeriod: U256::from(self.lock_period),
            cooldownPeriod: U256::from(self.cooldown_period),
            boostMultiplier: U256::from(self.boost_multiplier),
        }
    }
}

/// Parses a token amount in base units.
///
/// Accepts plain decimal integers (`86400000000000000000000`) and exact
/// scientific notation (`86400e18`, `1.5e18`). Anything that would not be a
/// whole number of base units is rejected.
pub fn parse_amount(input: &str) -> Result<U256, DeployerError> {
    let invalid = |reason: &str| {
        DeployerError::InvalidParameters(format!("invalid amount {:?}: {}", input, reason))
    };
    let cleaned: String = input.trim().chars().filter(|c| *c != '_').collect();

    let (mantissa, exponent) = match cleaned.split_once(['e', 'E']) {
        Some((mantissa, exponent)) => (
            mantissa,
            exponent
                .parse::<u32>()
                .map_err(|_| invalid("exponent must be a non-negative integer"))?,
        ),
        None => (cleaned.as_str(), 0),
    };

    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid("empty"));
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid("not a number"));
    }

    let fraction_digits = u32::try_from(fraction.len()).map_err(|_| invalid("too long"))?;
    let scale = exponent
        .checked_sub(fraction_digits)
        .ok_or_else(|| invalid("not a whole number of base units"))?;

    let digits = format!("{}{}", whole, fraction);
    let base = U256::from_str_radix(&digits, 10).map_err(|_| invalid("out of range"))?;
    let factor = U256::from(10u8)
        .checked_pow(U256::from(scale))
        .ok_or_else(|| invalid("out of range"))?;

    base.checked_mul(factor).ok_or_else(|| invalid("out of range"))
}
