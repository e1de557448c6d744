//! MCP JSON-RPC 2.0 message types, the tool/resource registries, and the dispatcher that ties
//! them together.
//!
//! This crate has no notion of HTTP, bearer tokens, or scopes — it is handed a already-decoded
//! JSON-RPC request and returns a JSON-RPC response (or nothing, for a notification). The
//! `mcpguard-server` crate is what wires authentication in front of it.

pub mod dispatcher;
pub mod resource;
pub mod rpc;
pub mod tool;

pub use dispatcher::{Dispatcher, ServerInfo};
pub use resource::{ResourceContent, ResourceDefinition, ResourceProvider, ResourceRegistry};
pub use rpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RequestId, error_code};
pub use tool::{ToolDefinition, ToolProvider, ToolRegistry};
