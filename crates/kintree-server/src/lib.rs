//! Kintree Server - WebSocket server for family tree queries
//!
//! This crate serves the derived family views over JSON-RPC 2.0 on a
//! WebSocket, for presentation layers that draw the trees.
//!
//! The server supports:
//! - Multiple concurrent connections
//! - Forest, nuclear family and search queries
//! - Any `SnapshotSource` as its record backend
//!
//! Nothing derived is cached. Each request takes a fresh snapshot from
//! the source and builds its own graph, so concurrent viewers never
//! share mutable state.

mod handlers;
mod protocol;
mod server;

pub use protocol::{
    codes, ForestParams, MemberParams, MembersParams, Request, Response, RpcError, SearchParams,
};
pub use server::{ServerConfig, ServerError, TreeServer, DEFAULT_PORT};
