//! The lost-alert loop.
//!
//! Armed exactly while the controller is in the Lost phase: one alert
//! immediately, then one every interval until disarmed. Arming while
//! armed and disarming while disarmed are both no-ops.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::alert::{AlertSink, ALERT_BODY, ALERT_TITLE};

pub struct AlertLoop {
    sink: Arc<dyn AlertSink>,
    interval: Duration,
    task: Option<(CancellationToken, JoinHandle<()>)>,
}

impl AlertLoop {
    pub fn new(sink: Arc<dyn AlertSink>, interval: Duration) -> Self {
        Self {
            sink,
            interval,
            task: None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.task.is_some()
    }

    /// Starts the repeating alert. Single-instance: a second arm while
    /// running is a no-op, never a duplicate timer.
    pub fn arm(&mut self) {
        if self.task.is_some() {
            debug!("Alert loop already armed");
            return;
        }
        info!("Arming lost-alert loop (every {:?})", self.interval);

        let token = CancellationToken::new();
        let child = token.clone();
        let sink = self.sink.clone();
        let every = self.interval;
        let handle = tokio::spawn(async move {
            sink.raise(ALERT_TITLE, ALERT_BODY);
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await; // the immediate tick, already delivered above
            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => sink.raise(ALERT_TITLE, ALERT_BODY),
                }
            }
        });
        self.task = Some((token, handle));
    }

    /// Cancels the timer and withdraws every displayed alert.
    pub async fn disarm(&mut self) {
        let Some((token, handle)) = self.task.take() else {
            return;
        };
        info!("Disarming lost-alert loop");
        token.cancel();
        let _ = handle.await;
        self.sink.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSink {
        raised: AtomicUsize,
        cleared: AtomicUsize,
    }

    impl AlertSink for CountingSink {
        fn raise(&self, _title: &str, _body: &str) {
            self.raised.fetch_add(1, Ordering::SeqCst);
        }
        fn clear(&self) {
            self.cleared.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_immediately_then_on_every_interval() {
        let sink = Arc::new(CountingSink::default());
        let mut alerts = AlertLoop::new(sink.clone(), Duration::from_secs(3));
        alerts.arm();
        assert!(alerts.is_armed());

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(sink.raised.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(sink.raised.load(Ordering::SeqCst), 4);

        alerts.disarm().await;
    }

    #[tokio::test(start_paused = true)]
    async fn arming_twice_does_not_duplicate_the_timer() {
        let sink = Arc::new(CountingSink::default());
        let mut alerts = AlertLoop::new(sink.clone(), Duration::from_secs(3));
        alerts.arm();
        alerts.arm();

        // Sleep past the tick boundary so the interval has surely fired.
        tokio::time::sleep(Duration::from_millis(3100)).await;
        assert_eq!(sink.raised.load(Ordering::SeqCst), 2);

        alerts.disarm().await;
    }

    #[tokio::test(start_paused = true)]
    async fn disarm_cancels_and_withdraws_alerts() {
        let sink = Arc::new(CountingSink::default());
        let mut alerts = AlertLoop::new(sink.clone(), Duration::from_secs(3));
        alerts.arm();
        tokio::time::sleep(Duration::from_millis(100)).await;
        alerts.disarm().await;
        assert!(!alerts.is_armed());
        assert_eq!(sink.cleared.load(Ordering::SeqCst), 1);

        let raised = sink.raised.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(sink.raised.load(Ordering::SeqCst), raised);

        // Disarming again is a no-op.
        alerts.disarm().await;
        assert_eq!(sink.cleared.load(Ordering::SeqCst), 1);
    }
}
