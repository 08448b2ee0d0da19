//! MCP tool definitions and dispatch.
//!
//! Each tool maps to one [`QueryDispatcher`] operation and defines its JSON
//! schema for input parameters.

use serde_json::{Value, json};

use crate::error::McpError;
use crate::protocol::{McpTool, McpToolResult};
use kubeprobe_query::{QueryDispatcher, QueryResponse};

fn tool(name: &str, description: &str, input_schema: Value) -> McpTool {
    McpTool {
        name: name.into(),
        description: description.into(),
        input_schema,
    }
}

fn no_params() -> Value {
    json!({ "type": "object", "properties": {} })
}

fn namespace_param(what: &str) -> Value {
    json!({
        "type": "object",
        "properties": {
            "namespace": {
                "type": "string",
                "description": format!("Namespace to list {} from. All namespaces when omitted.", what)
            }
        }
    })
}

/// Return all available MCP tools.
pub fn list_tools() -> Vec<McpTool> {
    vec![
        tool(
            "get_namespaces",
            "List all namespaces in the cluster with their phase and creation time.",
            no_params(),
        ),
        tool(
            "list_pods",
            "List pods with phase, IP, node and per-container readiness.",
            namespace_param("pods"),
        ),
        tool(
            "list_nodes",
            "List nodes with conditions, addresses, capacity, allocatable resources and kubelet version.",
            no_params(),
        ),
        tool(
            "failed_pods",
            "List pods in the Failed phase across all namespaces, with container states and restart counts.",
            no_params(),
        ),
        tool(
            "get_resource_yaml",
            "Fetch a single resource and return it as a YAML document. Supported types: pod, deployment, service, configmap, secret, job.",
            json!({
                "type": "object",
                "properties": {
                    "namespace": { "type": "string", "description": "Namespace containing the resource" },
                    "resource_type": {
                        "type": "string",
                        "enum": ["pod", "deployment", "service", "configmap", "secret", "job"]
                    },
                    "resource_name": { "type": "string", "description": "Name of the resource" }
                },
                "required": ["namespace", "resource_type", "resource_name"]
            }),
        ),
        tool(
            "list_deployments",
            "List deployments with desired, available and ready replicas.",
            namespace_param("deployments"),
        ),
        tool(
            "list_services",
            "List services with type, cluster IP, ports and selector.",
            namespace_param("services"),
        ),
        tool(
            "list_events",
            "List events with reason, message, involved object and timestamps.",
            namespace_param("events"),
        ),
        tool(
            "pending_pods",
            "List pods in the Pending phase and the most recent event explaining why.",
            no_params(),
        ),
        tool(
            "high_restart_pods",
            "Find pods with containers restarted more often than a threshold.",
            json!({
                "type": "object",
                "properties": {
                    "restart_threshold": {
                        "type": "integer",
                        "description": "Report containers restarted more than this many times",
                        "default": 5
                    }
                }
            }),
        ),
        tool(
            "node_capacity",
            "Show pod count, CPU and memory requests against allocatable resources for every node.",
            no_params(),
        ),
        tool(
            "orphaned_resources",
            "List pods, services, PVCs, config maps and secrets that have no owner references.",
            no_params(),
        ),
    ]
}

fn optional_str<'a>(args: &'a Value, key: &str) -> Result<Option<&'a str>, McpError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(McpError::InvalidParams(format!("'{}' must be a string", key))),
    }
}

fn required_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, McpError> {
    optional_str(args, key)?.ok_or_else(|| McpError::InvalidParams(format!("missing '{}'", key)))
}

fn optional_i32(args: &Value, key: &str) -> Result<Option<i32>, McpError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| McpError::InvalidParams(format!("'{}' must be an integer", key))),
    }
}

/// Dispatch a tool call by name.
pub async fn call_tool(
    name: &str,
    args: &Value,
    dispatcher: &QueryDispatcher,
) -> Result<McpToolResult, McpError> {
    let response = match name {
        "get_namespaces" => dispatcher.list_namespaces().await,
        "list_pods" => dispatcher.list_pods(optional_str(args, "namespace")?).await,
        "list_nodes" => dispatcher.list_nodes().await,
        "failed_pods" => dispatcher.list_failed_pods().await,
        "get_resource_yaml" => {
            let namespace = required_str(args, "namespace")?;
            let kind = required_str(args, "resource_type")?;
            let resource_name = required_str(args, "resource_name")?;
            dispatcher
                .get_resource_yaml(namespace, kind, resource_name)
                .await
        }
        "list_deployments" => dispatcher.list_deployments(optional_str(args, "namespace")?).await,
        "list_services" => dispatcher.list_services(optional_str(args, "namespace")?).await,
        "list_events" => dispatcher.list_events(optional_str(args, "namespace")?).await,
        "pending_pods" => dispatcher.list_pending_pods().await,
        "high_restart_pods" => {
            dispatcher
                .list_high_restart_pods(optional_i32(args, "restart_threshold")?)
                .await
        }
        "node_capacity" => dispatcher.node_capacity_report().await,
        "orphaned_resources" => dispatcher.orphaned_resources_report().await,
        _ => return Err(McpError::ToolNotFound(name.to_string())),
    };

    Ok(into_tool_result(response))
}

fn into_tool_result(response: QueryResponse) -> McpToolResult {
    if response.is_success() {
        McpToolResult::text(response.body)
    } else {
        McpToolResult::error(response.body, response.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_names_are_unique() {
        let tools = list_tools();
        let mut names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), tools.len());
    }

    #[test]
    fn optional_str_treats_empty_as_missing() {
        let args = json!({ "namespace": "", "other": 3 });
        assert_eq!(optional_str(&args, "namespace").unwrap(), None);
        assert_eq!(optional_str(&args, "absent").unwrap(), None);
        assert!(optional_str(&args, "other").is_err());
    }

    #[test]
    fn optional_i32_rejects_non_integers() {
        assert_eq!(optional_i32(&json!({ "n": 7 }), "n").unwrap(), Some(7));
        assert!(optional_i32(&json!({ "n": "7" }), "n").is_err());
        assert!(optional_i32(&json!({ "n": 1.5 }), "n").is_err());
    }
}
