use crate::clock::Clock;
use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::{CallLog, ChainCall};

/// Clock that records every requested delay in the call log instead of
/// waiting.
pub struct FakeClock {
    log: CallLog,
    cancel_on_sleep: Option<CancellationToken>,
}

impl FakeClock {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            cancel_on_sleep: None,
        }
    }

    /// Cancels `token` when a delay is requested and never completes,
    /// simulating an operator interrupting the wait.
    pub fn cancelling(log: CallLog, token: CancellationToken) -> Self {
        Self {
            log,
            cancel_on_sleep: Some(token),
        }
    }
}

#[async_trait]
impl Clock for FakeClock {
    async fn sleep(&self, duration: Duration) {
        self.log.push(ChainCall::Sleep(duration));
        if let Some(token) = &self.cancel_on_sleep {
            token.cancel();
            std::future::pending::<()>().await;
        }
    }
}
