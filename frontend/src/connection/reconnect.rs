use std::future::{Future, pending};
use std::pin::Pin;
use std::time::Duration;
use tokio::time::{Instant, Sleep};

pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Cancellable one-shot reconnect scheduler.
///
/// At most one reconnect is pending at a time; scheduling again restarts the
/// delay. [`fired`](ReconnectTimer::fired) is cancel-safe and can sit in a
/// `select!` loop.
#[derive(Debug)]
pub struct ReconnectTimer {
    delay: Duration,
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ReconnectTimer {
    pub fn new(delay: Duration) -> Self {
        Self { delay, sleep: None }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn schedule(&mut self) {
        self.sleep = Some(Box::pin(tokio::time::sleep_until(Instant::now() + self.delay)));
    }

    pub fn cancel(&mut self) {
        self.sleep = None;
    }

    pub fn is_pending(&self) -> bool {
        self.sleep.is_some()
    }

    /// Resolves once the scheduled delay elapses, then disarms. Never
    /// resolves while nothing is scheduled.
    pub async fn fired(&mut self) {
        match self.sleep.as_mut() {
            Some(sleep) => {
                sleep.as_mut().await;
                self.sleep = None;
            }
            None => pending::<()>().await,
        }
    }
}

/// Polls `slot` if it holds a future, otherwise never resolves.
pub(crate) async fn poll_slot<F: Future + Unpin>(slot: &mut Option<F>) -> F::Output {
    match slot.as_mut() {
        Some(future) => future.await,
        None => pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_once_after_delay() {
        let mut timer = ReconnectTimer::new(DEFAULT_RECONNECT_DELAY);
        let start = Instant::now();
        timer.schedule();
        assert!(timer.is_pending());

        timer.fired().await;
        assert!(Instant::now() - start >= DEFAULT_RECONNECT_DELAY);
        assert!(!timer.is_pending());

        let second = tokio::time::timeout(Duration::from_secs(60), timer.fired()).await;
        assert!(second.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_timer_never_fires() {
        let mut timer = ReconnectTimer::new(DEFAULT_RECONNECT_DELAY);
        timer.schedule();
        timer.cancel();

        let fired = tokio::time::timeout(Duration::from_secs(30), timer.fired()).await;
        assert!(fired.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_restarts_the_delay() {
        let mut timer = ReconnectTimer::new(Duration::from_secs(5));
        timer.schedule();
        tokio::time::sleep(Duration::from_secs(3)).await;
        timer.schedule();
        let rescheduled_at = Instant::now();

        timer.fired().await;
        assert!(Instant::now() - rescheduled_at >= Duration::from_secs(5));
    }
}
