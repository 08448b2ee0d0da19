//! kubeprobe MCP server
//!
//! Exposes the read-only cluster queries as Model Context Protocol tools.
//! The server speaks **JSON-RPC 2.0** over stdin/stdout, one message per line.
//!
//! | Tool | Description |
//! |------|-------------|
//! | `get_namespaces` | List namespaces |
//! | `list_pods` | List pods, optionally in one namespace |
//! | `list_nodes` | List nodes with conditions and capacity |
//! | `failed_pods` | Pods in phase `Failed` |
//! | `get_resource_yaml` | One object rendered as YAML |
//! | `list_deployments` | List deployments |
//! | `list_services` | List services |
//! | `list_events` | List events |
//! | `pending_pods` | Pending pods with their latest event |
//! | `high_restart_pods` | Pods with frequently restarting containers |
//! | `node_capacity` | Requested vs allocatable resources per node |
//! | `orphaned_resources` | Objects without owner references |

pub mod error;
pub mod protocol;
pub mod server;
pub mod tools;

pub use error::McpError;
pub use protocol::{JsonRpcRequest, JsonRpcResponse, McpTool, McpToolResult};
pub use server::McpServer;
