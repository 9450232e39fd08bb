//! flavord: serves the Kubernetes flavor plugin on a Unix socket.

pub mod client;
pub mod daemon;
pub mod discovery;
pub mod protocol;

pub use client::{ClientError, FlavorClient};
pub use daemon::{dispatch, run_daemon_server, serve};
pub use protocol::{
    ErrorCategory, FlavorCommand, InterfaceSpec, ResponseData, WireError, WireMessage,
};
