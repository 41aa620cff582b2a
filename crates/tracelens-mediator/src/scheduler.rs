use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

/// Lets pending presentation work (progress repaints) flush before the
/// caller continues with heavy synchronous work.
#[async_trait]
pub trait PresentationScheduler: Send + Sync {
    async fn yield_to_presentation(&self);
}

/// Yield once to the runtime.
#[derive(Clone, Copy, Debug, Default)]
pub struct TokioYield;

#[async_trait]
impl PresentationScheduler for TokioYield {
    async fn yield_to_presentation(&self) {
        tokio::task::yield_now().await;
    }
}

/// Give the presentation layer a fixed window to flush.
#[derive(Clone, Copy, Debug)]
pub struct FlushDelay(pub Duration);

#[async_trait]
impl PresentationScheduler for FlushDelay {
    async fn yield_to_presentation(&self) {
        tokio::time::sleep(self.0).await;
    }
}

/// `TokioYield` for a zero delay, `FlushDelay` otherwise.
pub fn scheduler_for_delay(delay: Duration) -> Arc<dyn PresentationScheduler> {
    if delay.is_zero() {
        Arc::new(TokioYield)
    } else {
        Arc::new(FlushDelay(delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn flush_delay_waits() {
        let start = tokio::time::Instant::now();
        FlushDelay(Duration::from_millis(16))
            .yield_to_presentation()
            .await;
        assert!(start.elapsed() >= Duration::from_millis(16));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_delay_only_yields() {
        let start = tokio::time::Instant::now();
        scheduler_for_delay(Duration::ZERO)
            .yield_to_presentation()
            .await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
