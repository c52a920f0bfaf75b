/// Limits on what an [`Env`](crate::Env) may submit on behalf of the deployer.
///
/// Guards are checked before every state-changing transaction and updated
/// after it was handed to the chain client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// Maximum number of transactions left to submit. A full deployment
    /// consumes 4: factory creation, setup, token transfer and activation.
    NumberOfAllowedCalls(u16),
}

impl Guard {
    pub fn check(&self) -> bool {
        match self {
            Guard::NumberOfAllowedCalls(remaining) => *remaining > 0,
        }
    }

    pub fn update(&mut self) {
        match self {
            Guard::NumberOfAllowedCalls(remaining) => {
                *remaining = remaining.saturating_sub(1);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn number_of_allowed_calls_runs_out() {
        let mut guard = Guard::NumberOfAllowedCalls(2);
        assert!(guard.check());
        guard.update();
        assert!(guard.check());
        guard.update();
        assert!(!guard.check());

        // stays exhausted
        guard.update();
        assert_eq!(guard, Guard::NumberOfAllowedCalls(0));
    }
}
