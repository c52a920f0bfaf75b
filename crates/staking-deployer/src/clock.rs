use std::time::Duration;

/// Source of delays for the orchestrator.
///
/// The real clock suspends the task; simulated clocks can complete at once so
/// test runs skip the propagation delay.
#[async_trait::async_trait]
pub trait Clock: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Timer-backed clock. Never blocks the runtime thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait::async_trait]
impl Clock for TokioClock {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn tokio_clock_waits_for_the_full_duration() {
        let start = tokio::time::Instant::now();
        TokioClock.sleep(Duration::from_secs(3)).await;
        assert!(start.elapsed() >= Duration::from_secs(3));
    }
}
