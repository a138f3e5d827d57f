//! HTTP API module.
//!
//! This module provides the HTTP server, the wire types and the import log
//! shared by the importer, the gateway and the job workers.

pub mod logs;
pub mod server;
pub mod types;

pub use logs::*;
pub use server::{router, start_server, AppState, UploadSettings};
pub use types::*;
