//! # vaultsync-transport
//!
//! Wire operations against a WebDAV store.
//!
//! [`RemoteStore`] is the seam the coordinator consumes: a depth-0
//! `PROPFIND` probe and a full-content `PUT`. [`RemoteFetch`] adds the
//! conditional `GET` used by the one-shot startup pull. [`WebDavClient`]
//! implements both over reqwest with HTTP Basic authentication.

pub mod client;
pub mod error;

pub use client::{Fetched, RemoteFetch, RemoteStore, WebDavClient};
pub use error::TransportError;
