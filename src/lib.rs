//! Static file server for local browser-based viewing of the Agon Web VDP.

pub mod logger;
pub mod server;
