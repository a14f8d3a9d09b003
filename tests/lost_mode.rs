//! End-to-end exercise of the full leave-behind cycle through the
//! public API: bond, connect, lose the umbrella, alert, reconnect.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use brolly::alert::AlertSink;
use brolly::config::AppConfig;
use brolly::error::{RadioError, StorageError};
use brolly::permissions::HostPermissionGate;
use brolly::storage::BondStore;
use brolly::{LinkEvent, Phase, PresenceController, Radio, Sighting, UiEvent};

/// Radio with a single umbrella that is either in or out of range.
struct OneUmbrellaRadio {
    in_range: Mutex<bool>,
    link_tx: Mutex<Option<mpsc::Sender<LinkEvent>>>,
}

impl OneUmbrellaRadio {
    const ID: &'static str = "F0:11:22:33:44:55";

    fn new() -> Arc<Self> {
        Arc::new(Self {
            in_range: Mutex::new(true),
            link_tx: Mutex::new(None),
        })
    }

    fn set_in_range(&self, in_range: bool) {
        *self.in_range.lock().unwrap() = in_range;
    }

    async fn drop_link(&self) {
        let tx = self.link_tx.lock().unwrap().clone().expect("no link watch");
        tx.send(LinkEvent::Down).await.expect("watch receiver gone");
    }
}

#[async_trait]
impl Radio for OneUmbrellaRadio {
    async fn scan_into(
        &self,
        out: mpsc::Sender<Sighting>,
        cancel: CancellationToken,
    ) -> Result<(), RadioError> {
        if *self.in_range.lock().unwrap() {
            let _ = out
                .send(Sighting {
                    id: Self::ID.to_string(),
                    advertised_name: Some("Brolly Classic".to_string()),
                    device_name: None,
                    rssi: -55,
                })
                .await;
        }
        cancel.cancelled().await;
        Ok(())
    }

    async fn connect(&self, _device_id: &str) -> Result<(), RadioError> {
        if *self.in_range.lock().unwrap() {
            Ok(())
        } else {
            Err(RadioError::ConnectTimeout)
        }
    }

    async fn disconnect(&self, _device_id: &str) -> Result<(), RadioError> {
        Ok(())
    }

    async fn watch_link(
        &self,
        _device_id: &str,
        out: mpsc::Sender<LinkEvent>,
        cancel: CancellationToken,
    ) -> Result<(), RadioError> {
        *self.link_tx.lock().unwrap() = Some(out);
        cancel.cancelled().await;
        Ok(())
    }
}

struct MemoryBonds(Mutex<Option<String>>);

#[async_trait]
impl BondStore for MemoryBonds {
    async fn load(&self) -> Result<Option<String>, StorageError> {
        Ok(self.0.lock().unwrap().clone())
    }
    async fn store(&self, device_id: &str) -> Result<(), StorageError> {
        *self.0.lock().unwrap() = Some(device_id.to_string());
        Ok(())
    }
    async fn forget(&self) -> Result<(), StorageError> {
        *self.0.lock().unwrap() = None;
        Ok(())
    }
}

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

async fn next_matching(
    events: &mut broadcast::Receiver<UiEvent>,
    pred: impl Fn(&UiEvent) -> bool,
) -> UiEvent {
    tokio::time::timeout(Duration::from_secs(600), async {
        loop {
            let event = events.recv().await.expect("event channel closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("expected event was never published")
}

#[tokio::test(start_paused = true)]
async fn full_leave_behind_cycle() {
    let radio = OneUmbrellaRadio::new();
    let bonds = Arc::new(MemoryBonds(Mutex::new(None)));
    let sink = Arc::new(CountingSink::default());
    let (controller, handle, mut events) = PresenceController::new(
        AppConfig::default(),
        radio.clone(),
        bonds.clone(),
        sink.clone(),
        Arc::new(HostPermissionGate),
    );
    tokio::spawn(controller.run());

    // First launch, nothing bonded: the user scans and picks the umbrella.
    handle.scan().await;
    next_matching(&mut events, |e| matches!(e, UiEvent::DeviceFound(_))).await;
    handle.connect(OneUmbrellaRadio::ID).await;
    next_matching(&mut events, |e| matches!(e, UiEvent::Connected { .. })).await;
    assert_eq!(
        bonds.load().await.unwrap(),
        Some(OneUmbrellaRadio::ID.to_string())
    );

    // The umbrella walks out of range and the link drops.
    radio.set_in_range(false);
    radio.drop_link().await;
    next_matching(&mut events, |e| matches!(e, UiEvent::LinkLost)).await;

    let status = handle.status().await.unwrap();
    assert_eq!(status.phase, Phase::Lost);

    // Alerts keep repeating while the umbrella stays out of range.
    tokio::time::sleep(Duration::from_secs(10)).await;
    let while_missing = sink.raised.load(Ordering::SeqCst);
    assert!(while_missing >= 3, "only {} alerts in 10 s", while_missing);

    // The umbrella comes back; a reconnect window finds it and the
    // cycle closes without any user action.
    radio.set_in_range(true);
    let event = next_matching(&mut events, |e| matches!(e, UiEvent::Connected { .. })).await;
    assert!(matches!(event, UiEvent::Connected { device_id } if device_id == OneUmbrellaRadio::ID));
    assert!(sink.cleared.load(Ordering::SeqCst) >= 1);

    let status = handle.status().await.unwrap();
    assert_eq!(status.phase, Phase::Connected);

    // Alerting stopped with the reconnection.
    let settled = sink.raised.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(20)).await;
    assert_eq!(sink.raised.load(Ordering::SeqCst), settled);

    handle.shutdown().await;
}
