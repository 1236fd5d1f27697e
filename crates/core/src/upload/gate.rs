//! Network gate in front of the dispatcher.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use sitecap_domain::PassSummary;
use tracing::{info, instrument};

use super::dispatcher::Dispatcher;
use super::ports::{ConnectivityProbe, ProgressObserver, Uploader};
use super::queue::UploadQueue;

/// Runs a dispatcher pass only when the probe reports connectivity.
pub struct NetworkGate {
    probe: Arc<dyn ConnectivityProbe>,
    dispatcher: Dispatcher,
}

impl NetworkGate {
    pub fn new(probe: Arc<dyn ConnectivityProbe>, dispatcher: Dispatcher) -> Self {
        Self { probe, dispatcher }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn queue(&self) -> &Arc<UploadQueue> {
        self.dispatcher.queue()
    }

    /// Process the queue if online. Offline passes return `{0, 0}` without
    /// touching any item.
    #[instrument(skip_all)]
    pub async fn process_queue(
        &self,
        uploader: &dyn Uploader,
        observer: Option<&dyn ProgressObserver>,
    ) -> PassSummary {
        if !self.probe.is_connected().await {
            info!("No network connection, skipping upload pass");
            return PassSummary::default();
        }

        self.dispatcher.process_queue(uploader, observer).await
    }
}

/// Connectivity flag set by the host application.
///
/// Suits platforms that push reachability changes instead of being polled.
#[derive(Debug)]
pub struct StaticConnectivity {
    connected: AtomicBool,
    checks: AtomicUsize,
}

impl StaticConnectivity {
    pub fn new(connected: bool) -> Self {
        Self { connected: AtomicBool::new(connected), checks: AtomicUsize::new(0) }
    }

    pub fn online() -> Self {
        Self::new(true)
    }

    pub fn offline() -> Self {
        Self::new(false)
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// How many times the gate has asked.
    pub fn check_count(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectivityProbe for StaticConnectivity {
    async fn is_connected(&self) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.connected.load(Ordering::SeqCst)
    }
}
