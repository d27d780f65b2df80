//! Network Monitoring Implementation

use bridge_traits::network::{NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

const STATUS_CONNECTED: u8 = 0;
const STATUS_DISCONNECTED: u8 = 1;
const STATUS_INDETERMINATE: u8 = 2;

/// Desktop network monitor implementation
///
/// Holds the process-wide connectivity state in an atomic so that reads are
/// lock-free from any thread. The state has a single writer: either the host
/// calling [`set_status`](Self::set_status), or the polling task started by
/// [`spawn_probe`](Self::spawn_probe) which performs a TCP reachability check.
///
/// Note: Platform-specific implementations (Linux netlink, macOS SystemConfiguration,
/// Windows WinAPI) would be more robust but require additional dependencies.
pub struct DesktopNetworkMonitor {
    status: AtomicU8,
    changes: watch::Sender<NetworkStatus>,
}

impl DesktopNetworkMonitor {
    /// Create a monitor whose status is unknown until the first probe
    pub fn new() -> Self {
        Self::with_status(NetworkStatus::Indeterminate)
    }

    /// Create a monitor with a known initial status
    pub fn with_status(status: NetworkStatus) -> Self {
        let (changes, _) = watch::channel(status);
        Self {
            status: AtomicU8::new(encode(status)),
            changes,
        }
    }

    /// Record a new connectivity status (single writer)
    pub fn set_status(&self, status: NetworkStatus) {
        let previous = decode(self.status.swap(encode(status), Ordering::AcqRel));
        if previous != status {
            debug!(?previous, current = ?status, "Network status changed");
            self.changes.send_replace(status);
        }
    }

    /// Subscribe to status transitions
    pub fn subscribe(&self) -> watch::Receiver<NetworkStatus> {
        self.changes.subscribe()
    }

    /// Check network connectivity by attempting a TCP connection
    pub async fn probe(&self, endpoint: &str) -> NetworkStatus {
        let status = match tokio::time::timeout(
            Duration::from_secs(5),
            tokio::net::TcpStream::connect(endpoint),
        )
        .await
        {
            Ok(Ok(_)) => NetworkStatus::Connected,
            Ok(Err(_)) => NetworkStatus::Disconnected,
            Err(_) => NetworkStatus::Disconnected,
        };
        self.set_status(status);
        status
    }

    /// Probe `endpoint` every `interval` until the returned task is aborted
    pub fn spawn_probe(
        self: &Arc<Self>,
        endpoint: impl Into<String>,
        interval: Duration,
    ) -> JoinHandle<()> {
        let monitor = Arc::clone(self);
        let endpoint = endpoint.into();
        tokio::spawn(async move {
            loop {
                monitor.probe(&endpoint).await;
                tokio::time::sleep(interval).await;
            }
        })
    }
}

impl Default for DesktopNetworkMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkMonitor for DesktopNetworkMonitor {
    fn network_info(&self) -> NetworkInfo {
        match self.status() {
            // On desktop we can't easily distinguish WiFi from Ethernet
            NetworkStatus::Connected => NetworkInfo::connected(NetworkType::Other),
            NetworkStatus::Disconnected => NetworkInfo::disconnected(),
            NetworkStatus::Indeterminate => NetworkInfo {
                status: NetworkStatus::Indeterminate,
                network_type: None,
                is_metered: false,
            },
        }
    }

    fn status(&self) -> NetworkStatus {
        decode(self.status.load(Ordering::Acquire))
    }
}

fn encode(status: NetworkStatus) -> u8 {
    match status {
        NetworkStatus::Connected => STATUS_CONNECTED,
        NetworkStatus::Disconnected => STATUS_DISCONNECTED,
        NetworkStatus::Indeterminate => STATUS_INDETERMINATE,
    }
}

fn decode(raw: u8) -> NetworkStatus {
    match raw {
        STATUS_CONNECTED => NetworkStatus::Connected,
        STATUS_DISCONNECTED => NetworkStatus::Disconnected,
        _ => NetworkStatus::Indeterminate,
    }
}
