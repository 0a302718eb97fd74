use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::interfaces::{CostmapSnapshot, CostmapSource};

/// Background refresher for the obstacle grid.
///
/// Runs its own cadence, decoupled from the control loop: a task polls the
/// source and replaces the latest snapshot in a watch slot. The loop reads
/// whatever snapshot is current at its tick, never blocking on a refresh.
pub struct CostmapService {
    source: Arc<dyn CostmapSource>,
    period: Duration,
    runtime: tokio::runtime::Handle,
    slot: watch::Sender<Option<CostmapSnapshot>>,
    task: Option<JoinHandle<()>>,
}

impl CostmapService {
    pub fn new(
        source: Arc<dyn CostmapSource>,
        period: Duration,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        let (slot, _) = watch::channel(None);
        Self {
            source,
            period,
            runtime,
            slot,
            task: None,
        }
    }

    /// Latest-snapshot receiver; holds None until the first refresh lands.
    pub fn subscribe(&self) -> watch::Receiver<Option<CostmapSnapshot>> {
        self.slot.subscribe()
    }

    /// Spawn the refresh task. No-op when already running.
    pub fn start(&mut self) {
        if self.task.is_some() {
            return;
        }

        let source = Arc::clone(&self.source);
        let slot = self.slot.clone();
        let period = self.period;
        self.task = Some(self.runtime.spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                match source.snapshot() {
                    Some(snapshot) => {
                        slot.send_replace(Some(snapshot));
                    }
                    None => debug!("costmap source returned no snapshot"),
                }
            }
        }));
    }

    /// Stop refreshing and clear the slot so a later activation starts fresh.
    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.slot.send_replace(None);
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for CostmapService {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    struct AlwaysFresh;

    impl CostmapSource for AlwaysFresh {
        fn snapshot(&self) -> Option<CostmapSnapshot> {
            Some(CostmapSnapshot::empty(Instant::now()))
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn refreshes_only_while_started() {
        let mut service = CostmapService::new(
            Arc::new(AlwaysFresh),
            Duration::from_millis(5),
            tokio::runtime::Handle::current(),
        );
        let rx = service.subscribe();
        assert!(rx.borrow().is_none());

        service.start();
        assert!(service.is_running());
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(rx.borrow().is_some());

        service.stop();
        assert!(!service.is_running());
        assert!(rx.borrow().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn start_twice_keeps_one_task() {
        let mut service = CostmapService::new(
            Arc::new(AlwaysFresh),
            Duration::from_millis(5),
            tokio::runtime::Handle::current(),
        );
        service.start();
        service.start();
        assert!(service.is_running());
        service.stop();
    }
}
