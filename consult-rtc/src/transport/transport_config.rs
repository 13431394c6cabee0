use consult_core::IceServerConfig;
use consult_core::utils::{DEFAULT_ICE_CANDIDATE_POOL_SIZE, default_ice_servers};

/// Settings for each native peer connection.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub ice_servers: Vec<IceServerConfig>,
    pub candidate_pool_size: u8,
    /// Gather 127.0.0.1 candidates too. Only useful when both peers share a host.
    pub include_loopback_candidates: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: default_ice_servers(),
            candidate_pool_size: DEFAULT_ICE_CANDIDATE_POOL_SIZE,
            include_loopback_candidates: false,
        }
    }
}

impl TransportConfig {
    /// No discovery servers and loopback candidates on. Peers on one machine
    /// connect without touching the network.
    pub fn local() -> Self {
        Self {
            ice_servers: Vec::new(),
            candidate_pool_size: 0,
            include_loopback_candidates: true,
        }
    }
}
