//! # Deployer Error Handling
//!
//! This module defines the error types used throughout the staking deployer.
//! Every chain interaction, local precondition check and configuration step
//! reports one of these variants, so a failed deployment can always be traced
//! back to a precise cause.
use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use std::{error::Error, fmt};

/// Errors that can occur while deploying and activating a staking rewards factory.
///
/// The first group mirrors what a chain client can report; the second group are
/// local precondition failures detected before anything is sent to the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DeployerError {
    /// The node could not be reached. Retryable by the operator, never automatically.
    ChainUnavailable(String),

    /// The node refused the transaction or the transaction reverted.
    TransactionRejected(String),

    /// Confirmation was not observed within the configured wait. The outcome is
    /// ambiguous: the operator must inspect the chain before re-running.
    Timeout(String),

    /// A read-only call reverted.
    CallReverted(String),

    /// Local validation of the deployment parameters failed.
    InvalidParameters(String),

    /// The deployer does not hold enough reward tokens for the transfer.
    InsufficientBalance { required: U256, available: U256 },

    /// The factory has no staking rewards record at the requested index.
    RecordNotFound(u64),

    /// Activation was requested before the expected funding landed.
    NotFunded { expected: U256, actual: U256 },

    /// A step was requested while the run is in a state that does not allow it.
    StepOutOfOrder(String),

    /// The run was interrupted while waiting on the chain or the propagation delay.
    Cancelled,

    /// Resuming a non-idempotent step requires operator confirmation.
    UnconfirmedRetry(String),

    /// A send was blocked by one of the environment guards.
    Unauthorized(String),

    /// The node reports a different chain id than the selected network.
    ChainIdMismatch { expected: u64, actual: u64 },

    /// A resume file was written for a different network than the one selected.
    ResumeMismatch(String),

    /// Error when a signing key cannot be loaded or used.
    SigningFailed(String),

    /// Error when the compiled contract artifact is missing or malformed.
    ArtifactError(String),

    /// Error when a file operation fails.
    FileReadError(String),

    /// Error when the configuration cannot be resolved.
    InvalidConfig(String),
}

impl fmt::Display for DeployerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ChainUnavailable(msg) => write!(f, "Chain unavailable: {}", msg),
            Self::TransactionRejected(msg) => write!(f, "Transaction rejected: {}", msg),
            Self::Timeout(msg) => write!(f, "Timed out: {}", msg),
            Self::CallReverted(msg) => write!(f, "Call reverted: {}", msg),
            Self::InvalidParameters(msg) => write!(f, "Invalid parameters: {}", msg),
            Self::InsufficientBalance {
                required,
                available,
            } => write!(
                f,
                "Insufficient balance: required {}, available {}",
                required, available
            ),
            Self::RecordNotFound(index) => {
                write!(f, "Staking rewards record {} not found", index)
            }
            Self::NotFunded { expected, actual } => write!(
                f,
                "Not funded: expected at least {}, found {}",
                expected, actual
            ),
            Self::StepOutOfOrder(msg) => write!(f, "Step out of order: {}", msg),
            Self::Cancelled => write!(f, "Cancelled"),
            Self::UnconfirmedRetry(msg) => write!(f, "Retry requires confirmation: {}", msg),
            Self::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            Self::ChainIdMismatch { expected, actual } => write!(
                f,
                "Chain id mismatch: expected {}, node reports {}",
                expected, actual
            ),
            Self::ResumeMismatch(msg) => write!(f, "Resume file mismatch: {}", msg),
            Self::SigningFailed(msg) => write!(f, "Signing operation failed: {}", msg),
            Self::ArtifactError(msg) => write!(f, "Artifact error: {}", msg),
            Self::FileReadError(msg) => write!(f, "File read error: {}", msg),
            Self::InvalidConfig(msg) => write!(f, "Invalid configuration: {}", msg),
        }
    }
}

impl Error for DeployerError {}

impl DeployerError {
    /// True when the failure is known to have happened before anything
    /// reached the chain, so repeating the step cannot duplicate its effect.
    pub fn was_not_submitted(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameters(_)
                | Self::InsufficientBalance { .. }
                | Self::RecordNotFound(_)
                | Self::NotFunded { .. }
                | Self::StepOutOfOrder(_)
                | Self::Unauthorized(_)
                | Self::ChainIdMismatch { .. }
                | Self::CallReverted(_)
        )
    }
}

/// Convert IO errors into DeployerError
impl From<std::io::Error> for DeployerError {
    fn from(err: std::io::Error) -> Self {
        Self::FileReadError(err.to_string())
    }
}

/// Convert JSON errors (artifacts, resume files) into DeployerError
impl From<serde_json::Error> for DeployerError {
    fn from(err: serde_json::Error) -> Self {
        Self::ArtifactError(format!("Invalid JSON: {}", err))
    }
}

/// Convert TOML errors into DeployerError
impl From<toml::de::Error> for DeployerError {
    fn from(err: toml::de::Error) -> Self {
        Self::InvalidConfig(err.to_string())
    }
}
