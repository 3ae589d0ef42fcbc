//! # crimp-client
//!
//! RPC client for crimp.
//!
//! This crate provides:
//! - `Client`: sequential call/reply over a message channel with sequence
//!   id correlation
//! - Oneway sends
//! - Remote exception decoding
//! - A TCP connect helper with timeout

pub mod client;
pub mod error;

pub use client::{Client, ClientConfig, TCall};
pub use error::ClientError;
