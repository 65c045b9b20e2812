//! Minimal node: advertise the two addresses VRChat pushes avatar state to,
//! and print whatever arrives on them.

use std::sync::Arc;

use oscquery::{Config, OscQueryServer};

#[tokio::main]
async fn main() {
    let sink = Arc::new(|addr: String, values| {
        println!("{addr}: {values:?}");
    });
    let server = OscQueryServer::new(Config::default(), sink);

    // Set up which data we want to receive from VRChat.
    oscquery::vrchat::receive_avatar_parameters(server.tree()).await;
    oscquery::vrchat::receive_tracking_data(server.tree()).await;

    let host_info = server.start().await.unwrap();
    println!(
        "OyasumiVR Test listening: HTTP {} / OSC {}:{}",
        host_info.http_port, host_info.osc_ip, host_info.osc_port
    );

    tokio::signal::ctrl_c().await.ok();
    server.stop().await.unwrap();
}
