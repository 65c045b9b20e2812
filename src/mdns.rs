//! Advertises the OSCQuery HTTP endpoint over mDNS and, optionally, primes
//! local discovery by browsing for it once after publishing (C7).
//!
//! Runs `mdns-sd` directly in-process: one `ServiceDaemon` handles both
//! `register` for publish and `browse` for the discovery-prime scan.

use std::time::Duration;

use log::{debug, warn};
use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};

use crate::error::Error;

const SERVICE_TYPE: &str = "_oscjson._tcp.local.";

/// Owns the mDNS daemon and the fullname of the currently registered
/// service, if any.
pub struct MdnsAdvertiser {
    daemon: ServiceDaemon,
    registered_fullname: Option<String>,
}

impl MdnsAdvertiser {
    pub fn new() -> Result<Self, Error> {
        let daemon = ServiceDaemon::new().map_err(|e| Error::Mdns(e.to_string()))?;
        Ok(Self {
            daemon,
            registered_fullname: None,
        })
    }

    /// Register `_oscjson._tcp.local.` for `service_name` on `port`,
    /// replacing any previous registration.
    pub fn publish(
        &mut self,
        service_name: &str,
        host_name: &str,
        ip: std::net::Ipv4Addr,
        port: u16,
    ) -> Result<(), Error> {
        self.unpublish();

        let host_fqdn = format!("{host_name}.local.");
        let properties: std::collections::HashMap<String, String> = std::collections::HashMap::new();
        let info = ServiceInfo::new(
            SERVICE_TYPE,
            service_name,
            &host_fqdn,
            ip.to_string(),
            port,
            properties,
        )
        .map_err(|e| Error::Mdns(e.to_string()))?;
        let fullname = info.get_fullname().to_string();
        self.daemon
            .register(info)
            .map_err(|e| Error::Mdns(e.to_string()))?;
        self.registered_fullname = Some(fullname);
        debug!("advertised {service_name} on {ip}:{port} via mDNS");
        Ok(())
    }

    /// Unregister the current service, if any. Errors are swallowed — the
    /// daemon is about to be shut down regardless.
    pub fn unpublish(&mut self) {
        if let Some(fullname) = self.registered_fullname.take() {
            if let Err(e) = self.daemon.unregister(&fullname) {
                warn!("failed to unregister mDNS service {fullname}: {e}");
            }
        }
    }

    /// One-shot best-effort browse for our own freshly published service,
    /// to nudge mDNS resolvers that cache negative lookups. Never surfaces
    /// an error — if the local resolver doesn't cooperate, OSCQuery clients
    /// can still find the service via their own independent browse.
    pub async fn prime_discovery(&self) {
        let receiver = match self.daemon.browse(SERVICE_TYPE) {
            Ok(r) => r,
            Err(e) => {
                debug!("discovery prime: browse failed, skipping: {e}");
                return;
            }
        };
        tokio::time::sleep(Duration::from_secs(2)).await;
        let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                break;
            }
            match tokio::time::timeout(remaining, async { receiver.recv_async().await }).await {
                Ok(Ok(ServiceEvent::ServiceResolved(info))) => {
                    debug!("discovery prime observed {}", info.get_fullname());
                }
                Ok(Ok(_)) => continue,
                Ok(Err(_)) | Err(_) => break,
            }
        }
        let _ = self.daemon.stop_browse(SERVICE_TYPE);
    }

    /// Unregister and shut down the daemon. Errors are swallowed — mDNS
    /// teardown is best-effort.
    pub fn shutdown(mut self) {
        self.unpublish();
        if let Err(e) = self.daemon.shutdown() {
            warn!("failed to shut down mDNS daemon: {e}");
        }
    }
}
