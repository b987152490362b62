//! Common test utilities and fixtures.

pub mod client;
pub mod fixtures;
pub mod server;

#[allow(unused_imports)]
pub use client::*;
#[allow(unused_imports)]
pub use fixtures::*;
#[allow(unused_imports)]
pub use server::*;
