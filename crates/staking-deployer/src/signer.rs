use crate::error::DeployerError;
use alloy::{primitives::Address, signers::local::PrivateKeySigner};
use std::fmt;

/// Deployer key used to sign every transaction of a run.
#[derive(Clone)]
pub struct Signer {
    signer: PrivateKeySigner,
}

impl Signer {
    pub fn new(signer: PrivateKeySigner) -> Self {
        Self { signer }
    }

    /// Parses a hex-encoded secp256k1 private key, with or without `0x`.
    pub fn from_private_key(private_key: &str) -> Result<Self, DeployerError> {
        let signer = private_key
            .trim()
            .parse::<PrivateKeySigner>()
            .map_err(|e| DeployerError::SigningFailed(format!("Invalid private key: {}", e)))?;
        Ok(Self { signer })
    }

    pub fn address(&self) -> Address {
        self.signer.address()
    }

    pub(crate) fn inner(&self) -> &PrivateKeySigner {
        &self.signer
    }
}

// Never print key material
impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer")
            .field("address", &self.address())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use alloy::primitives::address;

    // Well-known first development account of Hardhat and Anvil.
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn parses_key_with_and_without_prefix() {
        let expected = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");

        assert_eq!(Signer::from_private_key(DEV_KEY).unwrap().address(), expected);
        assert_eq!(
            Signer::from_private_key(DEV_KEY.trim_start_matches("0x"))
                .unwrap()
                .address(),
            expected
        );
    }

    #[test]
    fn rejects_malformed_key() {
        let err = Signer::from_private_key("not a key").unwrap_err();
        assert!(matches!(err, DeployerError::SigningFailed(_)));
    }

    #[test]
    fn debug_output_hides_key() {
        let signer = Signer::from_private_key(DEV_KEY).unwrap();
        let debug = format!("{:?}", signer);

        assert!(debug.contains("address"));
        assert!(!debug.contains(DEV_KEY.trim_start_matches("0x")));
    }
}
