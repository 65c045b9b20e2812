//! Ties the other seven components together into one instantiable node:
//! owns the tree and subscription filter from construction, and the HTTP
//! listener / UDP receiver / mDNS advertiser once started (C8).
//!
//! Grounded on the teacher's `server.rs::start_oscquery_service` for the
//! `TcpListener` + `watch`-channel accept loop, and on
//! `kittynXR-maowbot/maowbot-osc/src/oscquery/server.rs`'s instance-based
//! `OscQueryServer` struct shape (the teacher itself only ever has one,
//! process-wide, behind `LazyLock` statics).

use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use log::{info, warn};
use rand::Rng;
use tokio::net::TcpListener;
use tokio::sync::{watch, Mutex};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::http::{self, HostInfo as HttpHostInfo};
use crate::mdns::MdnsAdvertiser;
use crate::node::ArgValue;
use crate::osc_receiver::{OscReceiver, OscSink};
use crate::subscription::SubscriptionFilter;
use crate::tree::{MethodSpec, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OrchestratorState {
    Init,
    Starting,
    Running,
    Stopping,
    Stopped,
}

impl OrchestratorState {
    fn name(self) -> &'static str {
        match self {
            OrchestratorState::Init => "init",
            OrchestratorState::Starting => "starting",
            OrchestratorState::Running => "running",
            OrchestratorState::Stopping => "stopping",
            OrchestratorState::Stopped => "stopped",
        }
    }
}

/// Returned by [`OscQueryServer::start`] (spec.md §4.6).
#[derive(Debug, Clone)]
pub struct HostInfo {
    pub name: String,
    pub osc_transport: String,
    pub osc_ip: String,
    pub osc_port: u16,
    pub http_port: u16,
}

struct RunningState {
    http_shutdown: watch::Sender<bool>,
    osc_receiver: OscReceiver,
    mdns: Arc<Mutex<Option<MdnsAdvertiser>>>,
    http_port: u16,
}

/// An OSCQuery node. Instance-based — a process may run more than one,
/// unlike the teacher's process-wide singleton (see DESIGN.md).
pub struct OscQueryServer {
    config: Config,
    tree: Arc<Tree>,
    filter: Arc<SubscriptionFilter>,
    sink: OscSink,
    host_info: Arc<Mutex<HttpHostInfo>>,
    state: Mutex<OrchestratorState>,
    running: Mutex<Option<RunningState>>,
}

impl OscQueryServer {
    pub fn new(config: Config, sink: OscSink) -> Self {
        let tree = Arc::new(Tree::new(config.root_description.clone()));
        let host_info = HttpHostInfo {
            name: config.oscquery_host_name.clone(),
            osc_transport: config.osc_transport.clone(),
            osc_ip: String::new(),
            osc_port: 0,
        };
        Self {
            config,
            tree,
            filter: Arc::new(SubscriptionFilter::new()),
            sink,
            host_info: Arc::new(Mutex::new(host_info)),
            state: Mutex::new(OrchestratorState::Init),
            running: Mutex::new(None),
        }
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn subscription_filter(&self) -> &SubscriptionFilter {
        &self.filter
    }

    pub async fn add_method(&self, path: &str, spec: MethodSpec) {
        self.tree.add_method(path, spec).await;
    }

    pub async fn remove_method(&self, path: &str) {
        self.tree.remove_method(path).await;
    }

    pub async fn set_value(&self, path: &str, index: usize, value: ArgValue) -> Result<()> {
        self.tree.set_value(path, index, value).await?;
        Ok(())
    }

    pub async fn unset_value(&self, path: &str, index: usize) -> Result<()> {
        self.tree.unset_value(path, index).await?;
        Ok(())
    }

    /// Start order (spec.md §4.6): tree is already live from construction →
    /// HTTP listener → UDP listener → publish mDNS → schedule discovery
    /// prime.
    pub async fn start(&self) -> Result<HostInfo> {
        {
            let mut state = self.state.lock().await;
            match *state {
                OrchestratorState::Init | OrchestratorState::Stopped => {
                    *state = OrchestratorState::Starting;
                }
                other => {
                    return Err(Error::InvalidState {
                        action: "start",
                        state: other.name(),
                    })
                }
            }
        }

        let result = self.start_inner().await;
        let mut state = self.state.lock().await;
        *state = match &result {
            Ok(_) => OrchestratorState::Running,
            Err(_) => OrchestratorState::Stopped,
        };
        result
    }

    async fn start_inner(&self) -> Result<HostInfo> {
        let http_addr = SocketAddr::from((
            self.config.bind_address,
            self.config.http_port.unwrap_or(0),
        ));
        let listener = TcpListener::bind(http_addr).await.map_err(|e| Error::BindFailed {
            what: "HTTP listener",
            source: e,
        })?;
        let http_port = listener
            .local_addr()
            .map_err(|e| Error::BindFailed {
                what: "HTTP listener",
                source: e,
            })?
            .port();
        info!("HTTP listener bound on port {http_port}");

        let osc_port = match self.config.osc_port {
            Some(port) => port,
            None => pick_random_port(&self.config.osc_port_range),
        };
        let osc_receiver = OscReceiver::bind(
            Ipv4Addr::UNSPECIFIED,
            osc_port,
            self.filter.clone(),
            self.sink.clone(),
        )
        .await
        .map_err(|e| Error::BindFailed {
            what: "OSC UDP socket",
            source: e,
        })?;
        let osc_port = osc_receiver.local_addr().port();
        info!("OSC UDP receiver bound on port {osc_port}");

        let osc_ip = self.resolve_osc_ip();
        {
            let mut host_info = self.host_info.lock().await;
            host_info.osc_ip = osc_ip.clone();
            host_info.osc_port = osc_port;
        }

        let mut mdns = MdnsAdvertiser::new()?;
        mdns.publish(
            &self.config.service_name,
            &self.config.oscquery_host_name,
            self.advertise_ip(),
            http_port,
        )?;
        let mdns = Arc::new(Mutex::new(Some(mdns)));

        if self.config.enable_discovery_prime {
            let mdns_for_prime = mdns.clone();
            tokio::spawn(async move {
                let guard = mdns_for_prime.lock().await;
                if let Some(advertiser) = guard.as_ref() {
                    advertiser.prime_discovery().await;
                }
            });
        }

        let (http_shutdown, shutdown_rx) = watch::channel(false);
        spawn_http_listener(listener, shutdown_rx, self.tree.clone(), self.host_info.clone());

        *self.running.lock().await = Some(RunningState {
            http_shutdown,
            osc_receiver,
            mdns,
            http_port,
        });

        Ok(HostInfo {
            name: self.config.oscquery_host_name.clone(),
            osc_transport: self.config.osc_transport.clone(),
            osc_ip,
            osc_port,
            http_port,
        })
    }

    /// Shutdown order (reverse of start, spec.md §4.6): close UDP socket →
    /// unpublish + destroy mDNS → close HTTP server.
    pub async fn stop(&self) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            match *state {
                OrchestratorState::Running => *state = OrchestratorState::Stopping,
                OrchestratorState::Starting => {
                    drop(state);
                    self.wait_until_not_starting().await;
                    let mut state = self.state.lock().await;
                    if *state != OrchestratorState::Running {
                        return Ok(());
                    }
                    *state = OrchestratorState::Stopping;
                }
                _ => return Err(Error::NotRunning),
            }
        }

        if let Some(running) = self.running.lock().await.take() {
            running.osc_receiver.stop();
            if let Some(advertiser) = running.mdns.lock().await.take() {
                advertiser.shutdown();
            }
            let _ = running.http_shutdown.send(true);
        }

        *self.state.lock().await = OrchestratorState::Stopped;
        Ok(())
    }

    async fn wait_until_not_starting(&self) {
        loop {
            {
                let state = self.state.lock().await;
                if *state != OrchestratorState::Starting {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Update the advertised OSC port and re-publish the mDNS record,
    /// mirroring `server::set_osc_port` in the teacher (spec.md §9
    /// "Supplemented features").
    pub async fn set_osc_port(&self, port: u16) -> Result<()> {
        let running = self.running.lock().await;
        let Some(running) = running.as_ref() else {
            return Err(Error::NotRunning);
        };
        {
            let mut host_info = self.host_info.lock().await;
            host_info.osc_port = port;
        }
        let mut mdns_guard = running.mdns.lock().await;
        if let Some(advertiser) = mdns_guard.as_mut() {
            advertiser.publish(
                &self.config.service_name,
                &self.config.oscquery_host_name,
                self.advertise_ip(),
                running.http_port,
            )?;
        }
        Ok(())
    }

    fn resolve_osc_ip(&self) -> String {
        if let Some(ip) = &self.config.osc_ip {
            return ip.clone();
        }
        self.advertise_ip().to_string()
    }

    /// The IPv4 address mDNS publishes and `HOST_INFO.OSC_IP` defaults to,
    /// when not overridden: `bindAddress` unless it's `0.0.0.0`, in which
    /// case the machine's local link address.
    fn advertise_ip(&self) -> Ipv4Addr {
        if self.config.bind_address != Ipv4Addr::UNSPECIFIED {
            return self.config.bind_address;
        }
        match local_ip_address::local_ip() {
            Ok(std::net::IpAddr::V4(ip)) => ip,
            _ => Ipv4Addr::LOCALHOST,
        }
    }
}

fn pick_random_port(range: &std::ops::RangeInclusive<u16>) -> u16 {
    rand::rng().random_range(range.clone())
}

fn spawn_http_listener(
    listener: TcpListener,
    mut shutdown_rx: watch::Receiver<bool>,
    tree: Arc<Tree>,
    host_info: Arc<Mutex<HttpHostInfo>>,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                accept_result = listener.accept() => {
                    match accept_result {
                        Ok((stream, _)) => {
                            let tree = tree.clone();
                            let host_info = host_info.clone();
                            let mut conn_shutdown = shutdown_rx.clone();
                            tokio::spawn(async move {
                                let io = TokioIo::new(stream);
                                let service = service_fn(move |req: Request<Incoming>| {
                                    handle_hyper_request(tree.clone(), host_info.clone(), req)
                                });
                                tokio::select! {
                                    _ = http1::Builder::new().serve_connection(io, service) => {}
                                    _ = conn_shutdown.changed() => {}
                                }
                            });
                        }
                        Err(e) => {
                            warn!("HTTP accept error: {e}");
                            continue;
                        }
                    }
                }
                _ = shutdown_rx.changed() => {
                    break;
                }
            }
        }
    });
}

fn handle_hyper_request(
    tree: Arc<Tree>,
    host_info: Arc<Mutex<HttpHostInfo>>,
    req: Request<Incoming>,
) -> Pin<Box<dyn Future<Output = std::result::Result<Response<Full<Bytes>>, std::convert::Infallible>> + Send>> {
    Box::pin(async move {
        let method = req.method().as_str().to_string();
        let path = req.uri().path().to_string();
        let query = req.uri().query().map(str::to_string);

        let snapshot = host_info.lock().await.clone();
        let resp = http::handle_request(&tree, &snapshot, &method, &path, query.as_deref()).await;

        let status = match resp.status {
            http::StatusCode::Ok => hyper::StatusCode::OK,
            http::StatusCode::NoContent => hyper::StatusCode::NO_CONTENT,
            http::StatusCode::NotFound => hyper::StatusCode::NOT_FOUND,
            http::StatusCode::BadRequest => hyper::StatusCode::BAD_REQUEST,
        };
        let body = resp.body.map(|v| v.to_string()).unwrap_or_default();

        let mut response = Response::new(Full::new(Bytes::from(body)));
        *response.status_mut() = status;
        response.headers_mut().insert(
            hyper::header::CONTENT_TYPE,
            hyper::header::HeaderValue::from_static("application/json"),
        );
        Ok(response)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Access, ArgType, Argument};
    use std::sync::Mutex as StdMutex;

    fn test_config() -> Config {
        Config {
            http_port: None,
            osc_port: Some(0),
            bind_address: Ipv4Addr::LOCALHOST,
            osc_ip: Some("127.0.0.1".to_string()),
            osc_transport: "UDP".to_string(),
            oscquery_host_name: "test".to_string(),
            service_name: "test-oscquery".to_string(),
            root_description: None,
            osc_port_range: 40000..=40100,
            enable_discovery_prime: false,
        }
    }

    #[tokio::test]
    async fn start_then_stop_roundtrip() {
        let received = Arc::new(StdMutex::new(Vec::new()));
        let received_clone = received.clone();
        let sink: OscSink = Arc::new(move |addr, _values| {
            received_clone.lock().unwrap().push(addr);
        });
        let server = OscQueryServer::new(test_config(), sink);
        server
            .add_method(
                "/chatbox/input",
                MethodSpec {
                    description: None,
                    access: Access::WriteOnly,
                    tags: None,
                    critical: None,
                    arguments: vec![Argument::new(ArgType::OscString), Argument::new(ArgType::True)],
                },
            )
            .await;

        let host_info = server.start().await.expect("server starts");
        assert!(host_info.http_port > 0);
        assert!(host_info.osc_port > 0);

        server.stop().await.expect("server stops");
    }

    #[tokio::test]
    async fn double_start_is_rejected() {
        let sink: OscSink = Arc::new(|_, _| {});
        let server = OscQueryServer::new(test_config(), sink);
        server.start().await.expect("first start succeeds");
        let err = server.start().await.unwrap_err();
        assert!(matches!(err, Error::InvalidState { action: "start", .. }));
        server.stop().await.expect("stop succeeds");
    }

    #[tokio::test]
    async fn stop_without_start_errors() {
        let sink: OscSink = Arc::new(|_, _| {});
        let server = OscQueryServer::new(test_config(), sink);
        let err = server.stop().await.unwrap_err();
        assert!(matches!(err, Error::NotRunning));
    }
}
