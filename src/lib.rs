//! An OSCQuery node: advertises an OSC address space over HTTP/JSON and
//! mDNS (`_oscjson._tcp`), and receives OSC messages over UDP.
//!
//! [`orchestrator::OscQueryServer`] is the entry point — construct one with
//! a [`config::Config`] and a sink closure, register methods on its
//! [`tree::Tree`] via [`orchestrator::OscQueryServer::add_method`], then
//! `start()`/`stop()` it.

pub mod config;
pub mod error;
pub mod http;
pub mod mdns;
pub mod node;
pub mod orchestrator;
pub mod osc_receiver;
pub mod serializer;
pub mod subscription;
pub mod tree;
pub mod vrchat;

pub use config::Config;
pub use error::{Error, Result};
pub use node::{Access, ArgType, ArgValue, Argument, ClipMode, Node, Range};
pub use orchestrator::{HostInfo, OscQueryServer};
pub use osc_receiver::OscSink;
pub use subscription::SubscriptionFilter;
pub use tree::{MethodSpec, Tree};
