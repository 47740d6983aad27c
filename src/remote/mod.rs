//! Signed access to the remote commerce platform.
//!
//! Three layers, leaves first: [`signing`] builds the OAuth-style HMAC
//! authorization parameters, [`client`] executes signed requests with
//! bounded retry on transient transport failures, and [`catalog`] maps
//! between the domain product shape and the remote product resource.

mod catalog;
mod client;
mod signing;

pub use catalog::{RemoteCatalog, RemoteProduct, RemoteProductPayload};
pub use client::{RemoteError, SignedClient};
