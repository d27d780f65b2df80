//! Network Monitoring Abstraction
//!
//! Provides connectivity information used to gate mutating operations.

/// Network connection type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkType {
    /// Cellular/mobile data connection
    Cellular,
    /// WiFi connection
    WiFi,
    /// Ethernet connection
    Ethernet,
    /// Other or unknown connection type
    Other,
}

/// Network connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    /// Connected to network
    Connected,
    /// Not connected to any network
    Disconnected,
    /// Connection status unknown or indeterminate
    Indeterminate,
}

/// Network information
#[derive(Debug, Clone)]
pub struct NetworkInfo {
    pub status: NetworkStatus,
    pub network_type: Option<NetworkType>,
    /// Whether the connection is metered (has data limits/costs)
    pub is_metered: bool,
}

impl NetworkInfo {
    pub fn connected(network_type: NetworkType) -> Self {
        Self {
            status: NetworkStatus::Connected,
            network_type: Some(network_type),
            is_metered: matches!(network_type, NetworkType::Cellular),
        }
    }

    pub fn disconnected() -> Self {
        Self {
            status: NetworkStatus::Disconnected,
            network_type: None,
            is_metered: false,
        }
    }
}

/// Network monitor trait
///
/// Process-wide connectivity state. The core only ever *reads* it, and it
/// reads it synchronously at call time, right before issuing a mutating
/// request against the remote store. Implementations are expected to have a
/// single writer (the platform callback or a probe task) and to make reads
/// cheap and lock-free.
///
/// # Platform Support
///
/// - **Desktop**: periodic reachability probe (`bridge-desktop`)
/// - **iOS**: `NWPathMonitor`
/// - **Android**: `ConnectivityManager`
///
/// # Example
///
/// ```ignore
/// use bridge_traits::network::NetworkMonitor;
///
/// fn can_write(monitor: &dyn NetworkMonitor) -> bool {
///     monitor.is_connected()
/// }
/// ```
pub trait NetworkMonitor: Send + Sync {
    /// Current network information
    fn network_info(&self) -> NetworkInfo;

    /// Current connection status
    fn status(&self) -> NetworkStatus {
        self.network_info().status
    }

    /// Check if currently connected to any network
    fn is_connected(&self) -> bool {
        matches!(self.status(), NetworkStatus::Connected)
    }

    /// Check if connected via WiFi
    fn is_wifi(&self) -> bool {
        matches!(
            self.network_info(),
            NetworkInfo {
                status: NetworkStatus::Connected,
                network_type: Some(NetworkType::WiFi),
                ..
            }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(NetworkInfo);

    impl NetworkMonitor for Fixed {
        fn network_info(&self) -> NetworkInfo {
            self.0.clone()
        }
    }

    #[test]
    fn test_network_info() {
        let info = NetworkInfo::connected(NetworkType::WiFi);

        assert_eq!(info.status, NetworkStatus::Connected);
        assert_eq!(info.network_type, Some(NetworkType::WiFi));
        assert!(!info.is_metered);
        assert!(NetworkInfo::connected(NetworkType::Cellular).is_metered);
    }

    #[test]
    fn test_default_helpers() {
        let online = Fixed(NetworkInfo::connected(NetworkType::WiFi));
        assert!(online.is_connected());
        assert!(online.is_wifi());

        let offline = Fixed(NetworkInfo::disconnected());
        assert!(!offline.is_connected());
        assert!(!offline.is_wifi());

        let unknown = Fixed(NetworkInfo {
            status: NetworkStatus::Indeterminate,
            network_type: None,
            is_metered: false,
        });
        assert!(!unknown.is_connected());
    }
}
