//! ScrollScript MCP Server
//!
//! JSON-RPC 2.0 over stdio, one request per line.
//!
//! Tools:
//! - validate: Validate a script and build its config
//! - parse: Parse a script into its document tree
//! - resolve: Resolve the active variant of a config for a width or breakpoint
//! - breakpoints: List the configured breakpoint ranges

use scrollscript::{BuildMode, ScrollScript, ValidationRequest};
use scrollscript_core::{BuiltConfig, Settings, TargetSpec};
use scrollscript_runtime::{Resolver, StaticEnvironment};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const PROTOCOL_VERSION: &str = "2025-11-25";
const SERVER_NAME: &str = "scrollscript";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

// MCP Protocol types
#[derive(Debug, Deserialize)]
struct McpRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    id: Option<JsonValue>,
    method: String,
    #[serde(default)]
    params: Option<JsonValue>,
}

#[derive(Debug, Serialize)]
struct McpResponse {
    jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<JsonValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<McpError>,
}

#[derive(Debug, Serialize)]
struct McpError {
    code: i32,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<JsonValue>,
}

impl McpError {
    fn invalid_params(message: impl Into<String>) -> Self {
        Self { code: -32602, message: message.into(), data: None }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            warn!("Falling back to default settings: {}", e);
            Settings::default()
        }
    };
    let scrollscript = ScrollScript::new(settings);

    info!(
        version = SERVER_VERSION,
        protocol = PROTOCOL_VERSION,
        breakpoints = scrollscript.settings().breakpoints.len(),
        pro = scrollscript.settings().pro,
        "ScrollScript MCP Server started"
    );

    let stdin = io::stdin();
    let mut reader = io::BufReader::new(stdin.lock());

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => {
                info!("Client disconnected (EOF)");
                break;
            }
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let response = match serde_json::from_str::<McpRequest>(line) {
                    Ok(request) => {
                        debug!(method = %request.method, "processing");
                        let response = handle_request(&scrollscript, &request);
                        // Notifications (no id) get no response
                        if request.id.is_none() {
                            continue;
                        }
                        response
                    }
                    Err(e) => {
                        warn!("Error parsing request: {}", e);
                        McpResponse {
                            jsonrpc: "2.0".to_string(),
                            id: None,
                            result: None,
                            error: Some(McpError { code: -32700, message: format!("Parse error: {}", e), data: None }),
                        }
                    }
                };

                if let Err(e) = write_response(&response) {
                    error!("Error writing response: {}", e);
                    break;
                }
            }
            Err(e) => {
                error!("Error reading input: {}", e);
                break;
            }
        }
    }

    info!("Server shutting down");
}

fn write_response(response: &McpResponse) -> io::Result<()> {
    let text = serde_json::to_string(response)?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", text)?;
    stdout.flush()
}

fn handle_request(scrollscript: &ScrollScript, request: &McpRequest) -> McpResponse {
    let result = match request.method.as_str() {
        // Lifecycle
        "initialize" => handle_initialize(&request.params),
        "initialized" | "notifications/initialized" => Ok(json!({})),
        "ping" => Ok(json!({})),

        // Tools
        "tools/list" => handle_tools_list(),
        "tools/call" => handle_tool_call(scrollscript, &request.params),

        _ => Err(McpError {
            code: -32601,
            message: format!("Method not found: {}", request.method),
            data: None,
        }),
    };

    match result {
        Ok(r) => McpResponse {
            jsonrpc: "2.0".to_string(),
            id: request.id.clone(),
            result: Some(r),
            error: None,
        },
        Err(e) => McpResponse {
            jsonrpc: "2.0".to_string(),
            id: request.id.clone(),
            result: None,
            error: Some(e),
        },
    }
}

fn handle_initialize(params: &Option<JsonValue>) -> Result<JsonValue, McpError> {
    let client_info = params.as_ref()
        .and_then(|p| p.get("clientInfo"))
        .and_then(|c| c.get("name"))
        .and_then(|n| n.as_str())
        .unwrap_or("unknown");

    // Use client's protocol version for compatibility
    let client_protocol = params.as_ref()
        .and_then(|p| p.get("protocolVersion"))
        .and_then(|v| v.as_str())
        .unwrap_or(PROTOCOL_VERSION);

    info!(client = client_info, protocol = client_protocol, "client connected");

    Ok(json!({
        "protocolVersion": client_protocol,
        "serverInfo": {
            "name": SERVER_NAME,
            "version": SERVER_VERSION,
            "description": "Scroll animation script validation and responsive resolution"
        },
        "capabilities": {
            "tools": {
                "listChanged": false
            }
        },
        "instructions": "Use 'validate' to check a ScrollScript and get its built config. 'resolve' shows which variant runs at a given viewport width or breakpoint, and 'breakpoints' lists the configured ranges."
    }))
}

fn handle_tools_list() -> Result<JsonValue, McpError> {
    Ok(json!({
        "tools": [
            {
                "name": "validate",
                "description": "Validate a ScrollScript. Returns errors and warnings with line numbers plus the built tween or timeline config.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "script": { "type": "string", "description": "ScrollScript source" },
                        "mode": {
                            "type": "string",
                            "enum": ["auto", "tween", "timeline"],
                            "description": "Build mode (default: auto)"
                        },
                        "lintOnly": { "type": "boolean", "description": "Skip building the config" },
                        "widgetId": { "type": "string", "description": "Id stamped on the built config" }
                    },
                    "required": ["script"]
                }
            },
            {
                "name": "parse",
                "description": "Parse a ScrollScript into its document tree with source lines.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "script": { "type": "string", "description": "ScrollScript source" }
                    },
                    "required": ["script"]
                }
            },
            {
                "name": "resolve",
                "description": "Resolve the active variant for a viewport width or a named breakpoint. Pass a built config or a script.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "config": { "type": "object", "description": "Built config (as returned by validate)" },
                        "script": { "type": "string", "description": "ScrollScript source, built in auto mode" },
                        "width": { "type": "integer", "minimum": 1, "description": "Viewport width in px" },
                        "breakpoint": { "type": "string", "description": "Breakpoint slug; 'desktop' is the default range" },
                        "conditions": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "Active special conditions, e.g. reduced-motion, dark"
                        }
                    }
                }
            },
            {
                "name": "breakpoints",
                "description": "List the configured breakpoint ranges with their media queries.",
                "inputSchema": {
                    "type": "object",
                    "properties": {}
                }
            }
        ]
    }))
}

fn handle_tool_call(scrollscript: &ScrollScript, params: &Option<JsonValue>) -> Result<JsonValue, McpError> {
    let params = params.as_ref().ok_or_else(|| McpError::invalid_params("Missing params"))?;

    let name = params.get("name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| McpError::invalid_params("Missing tool name"))?;

    let args = params.get("arguments").cloned().unwrap_or(json!({}));

    match name {
        "validate" => tool_validate(scrollscript, args),
        "parse" => tool_parse(scrollscript, args),
        "resolve" => tool_resolve(scrollscript, args),
        "breakpoints" => tool_breakpoints(scrollscript),
        _ => Err(McpError::invalid_params(format!("Unknown tool: {}", name))),
    }
}

fn script_arg(args: &JsonValue) -> Result<&str, McpError> {
    args.get("script")
        .and_then(|v| v.as_str())
        .ok_or_else(|| McpError::invalid_params("Missing script argument"))
}

fn tool_validate(scrollscript: &ScrollScript, args: JsonValue) -> Result<JsonValue, McpError> {
    let request: ValidationRequest = serde_json::from_value(args)
        .map_err(|e| McpError::invalid_params(format!("Invalid arguments: {}", e)))?;

    let response = scrollscript.validate(&request);
    let is_error = !response.ok;
    let summary = format!(
        "{}: {} error(s), {} warning(s)",
        if response.ok { "OK" } else { "Invalid" },
        response.errors.len(),
        response.warnings.len()
    );

    Ok(json!({
        "content": [{ "type": "text", "text": summary }],
        "data": response,
        "isError": is_error
    }))
}

fn tool_parse(scrollscript: &ScrollScript, args: JsonValue) -> Result<JsonValue, McpError> {
    let script = script_arg(&args)?;

    match scrollscript.parse(script) {
        Ok(doc) => Ok(json!({
            "content": [{ "type": "text", "text": format!("Parsed with {} warning(s)", doc.warnings.len()) }],
            "data": doc,
            "isError": false
        })),
        Err(e) => Ok(json!({
            "content": [{ "type": "text", "text": e.to_string() }],
            "isError": true
        })),
    }
}

fn tool_resolve(scrollscript: &ScrollScript, args: JsonValue) -> Result<JsonValue, McpError> {
    let config = match args.get("config") {
        Some(config) => serde_json::from_value::<BuiltConfig>(config.clone())
            .map_err(|e| McpError::invalid_params(format!("Invalid config: {}", e)))?,
        None => {
            let script = script_arg(&args)?;
            scrollscript
                .compile(script, "preview", TargetSpec::default(), BuildMode::Auto)
                .map_err(|e| McpError::invalid_params(e.to_string()))?
                .config
        }
    };

    let conditions: Vec<String> = args.get("conditions")
        .and_then(|v| v.as_array())
        .map(|tags| tags.iter().filter_map(|t| t.as_str().map(String::from)).collect())
        .unwrap_or_default();

    let probe = StaticEnvironment::new().with_conditions(&conditions);
    let resolver = Resolver::new(scrollscript.settings().clone(), Arc::new(probe));

    let (range, variant) = match (args.get("breakpoint").and_then(|v| v.as_str()), args.get("width")) {
        (Some(slug), _) => {
            let range = resolver.range_by_slug(slug).map(|r| r.slug.clone());
            (range, resolver.resolve_forced(&config, slug))
        }
        (None, Some(width)) => {
            let width = width.as_u64()
                .and_then(|w| u32::try_from(w).ok())
                .filter(|w| *w > 0)
                .ok_or_else(|| McpError::invalid_params("width must be a positive integer"))?;
            let range = resolver.range_for_width(width).map(|r| r.slug.clone());
            (range, resolver.resolve_for_width(&config, width))
        }
        (None, None) => return Err(McpError::invalid_params("Provide width or breakpoint")),
    };

    let text = match (&range, &variant) {
        (Some(range), Some(v)) => format!("Range {}: {} variant", range, v.source),
        (Some(range), None) => format!("Range {}: no animation", range),
        (None, _) => "Unknown breakpoint".to_string(),
    };

    Ok(json!({
        "content": [{ "type": "text", "text": text }],
        "range": range,
        "data": variant,
        "isError": range.is_none()
    }))
}

fn tool_breakpoints(scrollscript: &ScrollScript) -> Result<JsonValue, McpError> {
    let ranges = scrollscript_runtime::build_breakpoint_ranges(&scrollscript.settings().breakpoints);
    let text = ranges.iter()
        .map(|r| format!("{}: {}", r.slug, r.query))
        .collect::<Vec<_>>()
        .join("\n");

    Ok(json!({
        "content": [{ "type": "text", "text": text }],
        "data": ranges
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(method: &str, params: JsonValue) -> McpResponse {
        let request = McpRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(json!(1)),
            method: method.to_string(),
            params: Some(params),
        };
        handle_request(&ScrollScript::default(), &request)
    }

    fn tool(name: &str, arguments: JsonValue) -> JsonValue {
        call("tools/call", json!({"name": name, "arguments": arguments}))
            .result
            .expect("tool result")
    }

    #[test]
    fn test_unknown_method() {
        let response = call("resources/list", json!({}));
        assert_eq!(response.error.map(|e| e.code), Some(-32601));
    }

    #[test]
    fn test_tools_listed() {
        let result = call("tools/list", json!({})).result.unwrap();
        let names: Vec<&str> = result["tools"].as_array().unwrap().iter().filter_map(|t| t["name"].as_str()).collect();
        assert_eq!(names, vec!["validate", "parse", "resolve", "breakpoints"]);
    }

    #[test]
    fn test_validate_empty_script() {
        let result = tool("validate", json!({"script": "   "}));
        assert_eq!(result["isError"], true);
        assert_eq!(result["data"]["errors"][0]["message"], "Empty script.");
        assert_eq!(result["data"]["config"], JsonValue::Null);
    }

    #[test]
    fn test_validate_builds_config() {
        let result = tool("validate", json!({"script": "[animation]\nduration: 0.8", "widgetId": "hero"}));
        assert_eq!(result["data"]["ok"], true);
        assert_eq!(result["data"]["config"]["id"], "hero");
        assert_eq!(result["data"]["config"]["widget"], "scroll_animation");
    }

    #[test]
    fn test_resolve_by_width_and_breakpoint() {
        let script = "[animation]\nduration: 1\n[animation @mobile]\nduration: 0.4";

        let result = tool("resolve", json!({"script": script, "width": 375}));
        assert_eq!(result["range"], "mobile");
        assert_eq!(result["data"]["source"], "media:mobile");
        assert_eq!(result["data"]["animation"]["duration"], 0.4);

        let result = tool("resolve", json!({"script": script, "breakpoint": "desktop"}));
        assert_eq!(result["range"], "_default_desktop");
        assert_eq!(result["data"]["source"], "base");
    }

    #[test]
    fn test_resolve_with_reduced_motion() {
        let script = "[animation]\nduration: 1\n[animation @reduced-motion]\nduration: 0";
        let result = tool("resolve", json!({"script": script, "width": 1440, "conditions": ["reduced-motion"]}));
        assert_eq!(result["data"]["source"], "condition:reduced-motion");
    }

    #[test]
    fn test_resolve_requires_position() {
        let response = call("tools/call", json!({"name": "resolve", "arguments": {"script": "[animation]\nduration: 1"}}));
        assert_eq!(response.error.map(|e| e.code), Some(-32602));
    }

    #[test]
    fn test_breakpoints() {
        let result = tool("breakpoints", json!({}));
        let slugs: Vec<&str> = result["data"].as_array().unwrap().iter().filter_map(|r| r["slug"].as_str()).collect();
        assert_eq!(slugs, vec!["mobile", "tablet", "_default_desktop"]);
    }
}
