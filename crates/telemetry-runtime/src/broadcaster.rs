use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use telemetry_core::{snapshots_have_usable_data, DaemonState, UsageSnapshot};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::runtime::ViewRuntime;

const WARM_UP_ATTEMPTS: u32 = 8;
const WARM_UP_INTERVAL: Duration = Duration::from_secs(1);
const MIN_CADENCE: Duration = Duration::from_secs(1);
const MAX_CADENCE: Duration = Duration::from_secs(5);

/// Snapshot + state feed the UI subscribes to.
pub struct BroadcastHandles {
    pub snapshots: watch::Receiver<HashMap<String, UsageSnapshot>>,
    pub state: watch::Receiver<DaemonState>,
}

/// Periodic task that drives a [`ViewRuntime`] and republishes its results
/// to a UI over `watch` channels, with a fast warm-up phase before settling
/// into steady-state polling.
pub struct Broadcaster {
    snapshots_tx: watch::Sender<HashMap<String, UsageSnapshot>>,
    state_tx: watch::Sender<DaemonState>,
}

impl Broadcaster {
    pub fn new() -> (Self, BroadcastHandles) {
        let (snapshots_tx, snapshots_rx) = watch::channel(HashMap::new());
        let (state_tx, state_rx) = watch::channel(DaemonState::default());
        (
            Self { snapshots_tx, state_tx },
            BroadcastHandles {
                snapshots: snapshots_rx,
                state: state_rx,
            },
        )
    }

    pub async fn run(&self, runtime: Arc<ViewRuntime>, refresh_interval: Duration, cancel: CancellationToken) {
        let cadence = refresh_interval.div_f32(3.0).clamp(MIN_CADENCE, MAX_CADENCE);

        self.warm_up(&runtime).await;

        let mut ticker = tokio::time::interval(cadence);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => self.tick(&runtime).await,
            }
        }
    }

    async fn warm_up(&self, runtime: &ViewRuntime) {
        for attempt in 0..WARM_UP_ATTEMPTS {
            let snaps = runtime.read_with_fallback().await;
            let _ = self.state_tx.send(runtime.state());

            if let Some(snaps) = snaps {
                let usable = snapshots_have_usable_data(&snaps);
                if !snaps.is_empty() {
                    let _ = self.snapshots_tx.send(snaps);
                }
                if usable {
                    return;
                }
            }

            if attempt + 1 < WARM_UP_ATTEMPTS {
                tokio::time::sleep(WARM_UP_INTERVAL).await;
            }
        }
    }

    async fn tick(&self, runtime: &ViewRuntime) {
        let snaps = runtime.read_with_fallback().await;
        let _ = self.state_tx.send(runtime.state());
        if let Some(snaps) = snaps {
            if !snaps.is_empty() {
                let _ = self.snapshots_tx.send(snaps);
            }
        }
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new().0
    }
}
