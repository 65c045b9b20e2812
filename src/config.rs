//! Construction options for [`OscQueryServer`](crate::orchestrator::OscQueryServer).
//!
//! Option bags are expressed as an explicit, fully-defaulted configuration
//! record rather than a free-form mapping.

use std::net::Ipv4Addr;
use std::ops::RangeInclusive;

/// Construction options recognized when building an `OscQueryServer`.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP port for the HTTP API; auto-allocated (OS-assigned ephemeral)
    /// when `None`.
    pub http_port: Option<u16>,

    /// UDP port for OSC; when `None`, a random port is drawn from
    /// `osc_port_range` (no bind-probing; collisions surface as bind
    /// failures).
    pub osc_port: Option<u16>,

    /// Interface for the HTTP listener.
    pub bind_address: Ipv4Addr,

    /// Value advertised in `HOST_INFO.OSC_IP`; defaults to `bind_address`
    /// unless that's `0.0.0.0`, in which case the local link IP is resolved
    /// via `local-ip-address` at start time.
    pub osc_ip: Option<String>,

    /// Advertised transport string.
    pub osc_transport: String,

    /// Advertised `HOST_INFO.NAME`.
    pub oscquery_host_name: String,

    /// mDNS instance name.
    pub service_name: String,

    /// Description assigned to the root node.
    pub root_description: Option<String>,

    /// Range the OSC port is drawn from when `osc_port` is unset.
    pub osc_port_range: RangeInclusive<u16>,

    /// Whether to run the one-shot mDNS discovery-prime browse after
    /// publishing.
    pub enable_discovery_prime: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: None,
            osc_port: None,
            bind_address: Ipv4Addr::UNSPECIFIED,
            osc_ip: None,
            osc_transport: "UDP".to_string(),
            oscquery_host_name: "OSCQuery".to_string(),
            service_name: "OSCQuery".to_string(),
            root_description: None,
            osc_port_range: 22000..=50000,
            enable_discovery_prime: true,
        }
    }
}
