//! The reconnect loop.
//!
//! Armed while Lost (and only if a bonded id exists). It owns no radio
//! state: every interval it posts one tick message back into the
//! controller's mailbox, and the controller decides whether a reconnect
//! scan session is due. Same single-instance discipline as the alert loop.

use std::time::Duration;

use log::{debug, info};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct ReconnectLoop<M> {
    tx: mpsc::Sender<M>,
    tick: M,
    interval: Duration,
    task: Option<(CancellationToken, JoinHandle<()>)>,
}

impl<M: Clone + Send + 'static> ReconnectLoop<M> {
    pub fn new(tx: mpsc::Sender<M>, tick: M, interval: Duration) -> Self {
        Self {
            tx,
            tick,
            interval,
            task: None,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.task.is_some()
    }

    /// Starts ticking; the first tick fires one interval after arming.
    pub fn arm(&mut self) {
        if self.task.is_some() {
            debug!("Reconnect loop already armed");
            return;
        }
        info!("Arming reconnect loop (every {:?})", self.interval);

        let token = CancellationToken::new();
        let child = token.clone();
        let tx = self.tx.clone();
        let tick = self.tick.clone();
        let every = self.interval;
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await; // skip the immediate tick
            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => {
                        if tx.send(tick.clone()).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });
        self.task = Some((token, handle));
    }

    /// Cancels the periodic timer. A tick already in the mailbox is
    /// harmless: the controller ignores ticks outside the Lost phase.
    pub async fn disarm(&mut self) {
        let Some((token, handle)) = self.task.take() else {
            return;
        };
        info!("Disarming reconnect loop");
        token.cancel();
        let _ = handle.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn ticks_at_the_configured_cadence() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut reconnect = ReconnectLoop::new(tx, (), Duration::from_secs(3));
        reconnect.arm();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(rx.try_recv().is_err(), "no tick before the first interval");

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());

        reconnect.disarm().await;
    }

    #[tokio::test(start_paused = true)]
    async fn disarm_stops_ticking_and_is_idempotent() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut reconnect = ReconnectLoop::new(tx, (), Duration::from_secs(3));
        reconnect.arm();
        reconnect.disarm().await;
        reconnect.disarm().await;

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(rx.try_recv().is_err());
        assert!(!reconnect.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn arm_while_armed_is_a_no_op() {
        let (tx, mut rx) = mpsc::channel(16);
        let mut reconnect = ReconnectLoop::new(tx, (), Duration::from_secs(3));
        reconnect.arm();
        reconnect.arm();

        // Sleep past the tick boundary so the interval has surely fired.
        tokio::time::sleep(Duration::from_millis(3100)).await;
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err(), "a second armed loop would double-tick");

        reconnect.disarm().await;
    }
}
