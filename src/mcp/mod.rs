//! Model Context Protocol (MCP) server.
//!
//! Exposes the assembly analysis engines as MCP tools. The server speaks
//! JSON-RPC 2.0 over newline-delimited stdio.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────────┐
//! │  Transport   │───▶│   Server     │───▶│  analysis::*     │
//! │  (stdio)     │    │  (lifecycle) │    │  (engines)       │
//! └──────────────┘    └──────────────┘    └────────┬─────────┘
//!                                                  │
//!                                                  ▼
//!                                         ┌──────────────────┐
//!                                         │  OnshapeClient   │
//!                                         │  (REST API)      │
//!                                         └──────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod protocol;
pub mod server;
pub mod transport;

pub use protocol::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, OutgoingMessage, MCP_PROTOCOL_VERSION,
};
pub use server::{tool_definitions, McpServer, ServerState, ToolCallResult};
pub use transport::{StdioTransport, Transport};
