//! Hand-registers a readable/writable float method instead of using the
//! `vrchat` convenience constructors, and narrows the subscription filter
//! down to a single address prefix.

use std::sync::Arc;

use oscquery::node::{Access, ArgType, ArgValue, Argument, Range};
use oscquery::tree::MethodSpec;
use oscquery::{Config, OscQueryServer};

#[tokio::main]
async fn main() {
    let sink = Arc::new(|addr: String, values: Vec<ArgValue>| {
        println!("{addr}: {values:?}");
    });
    let server = OscQueryServer::new(Config::default(), sink);

    let mut volume = Argument::new(ArgType::Float32);
    volume.range = Some(Range {
        min: Some(0.0),
        max: Some(1.0),
        vals: None,
    });
    volume.value = Some(ArgValue::Float(0.5));

    server
        .add_method(
            "/avatar/parameters/VolumeLevel",
            MethodSpec {
                description: Some("Microphone volume level".to_string()),
                access: Access::ReadWrite,
                tags: None,
                critical: None,
                arguments: vec![volume],
            },
        )
        .await;

    // Only deliver addresses under /avatar/parameters to the sink.
    server
        .subscription_filter()
        .subscribe("/avatar/parameters/*")
        .await;

    let host_info = server.start().await.unwrap();
    println!(
        "HTTP {} / OSC {}:{}",
        host_info.http_port, host_info.osc_ip, host_info.osc_port
    );

    tokio::signal::ctrl_c().await.ok();
    server.stop().await.unwrap();
}
