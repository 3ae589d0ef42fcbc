//! # crimp-server
//!
//! RPC server for crimp.
//!
//! This crate provides:
//! - `Server`: an immutable method-name to handler table
//! - `run_connection`: the sequential dispatch loop over any channel
//! - Exception replies for unknown methods and handler failures
//! - `TcpServer`: accept loop with per-connection tasks and shutdown

pub mod context;
pub mod error;
pub mod server;
pub mod tcp;

pub use context::ConnContext;
pub use error::{HandlerError, ServerError};
pub use server::{run_connection, Handler, Server, ServerBuilder};
pub use tcp::{ServerConfig, ServerStats, TcpServer};
