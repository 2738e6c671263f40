//! Database bootstrap for the Pulse SQLite store

pub mod init;

pub use init::*;
