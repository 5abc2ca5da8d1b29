//! Room server library for triplog.
//!
//! The `triplog-server` binary is a thin wrapper around [`server::router`].

pub mod server;
