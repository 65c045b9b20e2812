//! UDP listener decoding inbound OSC messages and delivering them to the
//! subscription filter (C5).
//!
//! The accept loop mirrors the teacher's demo server
//! (`demos/osc_server/mod.rs`'s `recv_from`/`decode_udp` pairing and MTU
//! buffer), ported from a blocking `std::net::UdpSocket` + `std::thread` to
//! an async `tokio::net::UdpSocket` + task, per §5's "parallel" scheduling
//! model. Bundle flattening is grounded on `x37v-oscquery-rs`'s recursive
//! `handle_osc_packet_inner`.

use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::pin::Pin;
use std::sync::Arc;

use log::warn;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

use crate::node::ArgValue;
use crate::subscription::SubscriptionFilter;

/// The external sink OSC messages are delivered to. The core does not
/// interpret the payload (spec.md §6).
pub type OscSink = Arc<dyn Fn(String, Vec<ArgValue>) + Send + Sync>;

/// Owns the UDP socket and its accept task.
pub struct OscReceiver {
    local_addr: SocketAddr,
    task: JoinHandle<()>,
}

impl OscReceiver {
    /// Bind `0.0.0.0:port` (or an ephemeral port if `port` is 0) and start
    /// the receive loop.
    pub async fn bind(
        bind_ip: Ipv4Addr,
        port: u16,
        filter: Arc<SubscriptionFilter>,
        sink: OscSink,
    ) -> std::io::Result<Self> {
        let socket = UdpSocket::bind((bind_ip, port)).await?;
        let local_addr = socket.local_addr()?;
        let task = tokio::spawn(async move {
            let mut buf = [0u8; rosc::decoder::MTU];
            loop {
                match socket.recv_from(&mut buf).await {
                    Ok((size, _src)) => match rosc::decoder::decode_udp(&buf[..size]) {
                        Ok((_, packet)) => dispatch_packet(packet, filter.clone(), sink.clone()).await,
                        Err(e) => warn!("dropping malformed OSC datagram: {e:?}"),
                    },
                    Err(e) => {
                        warn!("OSC receive error: {e}");
                    }
                }
            }
        });
        Ok(Self { local_addr, task })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Close the UDP socket by aborting its task (§4.6 shutdown order,
    /// step 1).
    pub fn stop(self) {
        self.task.abort();
    }
}

fn dispatch_packet(
    packet: rosc::OscPacket,
    filter: Arc<SubscriptionFilter>,
    sink: OscSink,
) -> Pin<Box<dyn Future<Output = ()> + Send>> {
    Box::pin(async move {
        match packet {
            rosc::OscPacket::Message(msg) => {
                if filter.accepts(&msg.addr).await {
                    let values = msg.args.iter().map(convert_osc_type).collect();
                    sink(msg.addr, values);
                }
            }
            rosc::OscPacket::Bundle(bundle) => {
                // Bundle timing semantics are out of scope (spec.md §1
                // Non-goals); each contained message is just flattened and
                // filtered independently.
                for inner in bundle.content {
                    dispatch_packet(inner, filter.clone(), sink.clone()).await;
                }
            }
        }
    })
}

fn convert_osc_type(value: &rosc::OscType) -> ArgValue {
    use rosc::OscType as T;
    match value {
        T::Int(v) => ArgValue::Int(*v),
        T::Float(v) => ArgValue::Float(*v),
        T::String(v) => ArgValue::String(v.clone()),
        T::Blob(v) => ArgValue::Blob(v.clone()),
        T::Time(v) => ArgValue::TimeTag(*v),
        T::Long(v) => ArgValue::Int64(*v),
        T::Double(v) => ArgValue::Double(*v),
        T::Char(v) => ArgValue::Char(*v),
        T::Color(v) => ArgValue::Rgba(*v),
        T::Midi(v) => ArgValue::Midi(*v),
        T::Bool(true) => ArgValue::True,
        T::Bool(false) => ArgValue::False,
        T::Nil => ArgValue::Nil,
        T::Inf => ArgValue::Infinitum,
        T::Array(arr) => ArgValue::Nested(arr.content.iter().map(convert_osc_type).collect()),
    }
}
