//! Integration test common infrastructure.
//!
//! Provides utilities for spawning test servers and driving them with a
//! packet-level test client.

// Each test binary compiles its own copy; not every binary uses every helper.
#![allow(dead_code)]

pub mod client;
pub mod server;

#[allow(unused_imports)]
pub use client::TestClient;
#[allow(unused_imports)]
pub use server::TestServer;
