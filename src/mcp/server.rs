//! MCP server exposing assembly analysis tools.
//!
//! This module implements the MCP server lifecycle:
//!
//! 1. **Initialisation**: Capability negotiation and version agreement
//! 2. **Operation**: Handling tool calls and other requests
//! 3. **Shutdown**: Graceful connection termination
//!
//! # Tools
//!
//! | Tool                          | Operation                                   |
//! |-------------------------------|---------------------------------------------|
//! | `get_assembly`                | instance listing                            |
//! | `check_assembly_interference` | pairwise AABB interference report           |
//! | `get_assembly_positions`      | per-instance position and size report       |
//! | `set_instance_position`       | absolute placement (inches)                 |
//! | `align_instance_to_face`      | flush alignment against a face of another   |
//! | `transform_instance`          | relative move and rotation                  |
//!
//! The server is generic over its collaborator so tests can drive it with an
//! in-memory assembly instead of the Onshape API.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::analysis::{
    align_to_face, check_interference, format_assembly_summary, format_interference_result,
    get_positions, set_absolute_position, transform_instance, AnalysisError, AssemblySource,
    ElementPath, PartGeometrySource,
};
use crate::mcp::protocol::{
    parse_message, IncomingMessage, JsonRpcError, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, OutgoingMessage, RequestId, MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::transport::{StdioTransport, Transport};

/// Server state in the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for initialize request.
    AwaitingInit,
    /// Initialize received, waiting for initialized notification.
    Initialising,
    /// Ready for normal operation.
    Running,
    /// Shutdown in progress.
    ShuttingDown,
}

/// Server capabilities advertised during initialisation.
#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolCapabilities>,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            tools: Some(ToolCapabilities::default()),
        }
    }
}

/// Tool-specific capabilities.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change during the session.
    #[serde(rename = "listChanged", skip_serializing_if = "is_false")]
    pub list_changed: bool,
}

#[allow(clippy::trivially_copy_pass_by_ref)] // serde's skip_serializing_if requires a predicate fn(&T) -> bool
const fn is_false(b: &bool) -> bool {
    !*b
}

/// Server information for initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Client information received during initialisation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters for the initialize request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by client.
    pub protocol_version: String,
    /// Client capabilities.
    #[serde(default)]
    pub capabilities: Value,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// A tool definition for tools/list response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema for the tool's input parameters.
    pub input_schema: Value,
}

/// Parameters for tools/call request.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool.
    #[serde(default)]
    pub arguments: Value,
}

/// Content item in a tool call response.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content returned by the tool.
    pub content: Vec<ToolContent>,
    /// Whether the tool call resulted in an error.
    #[serde(skip_serializing_if = "is_false")]
    pub is_error: bool,
}

impl ToolCallResult {
    /// Creates a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Creates an error text result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }

    /// Returns the text of the first content item.
    #[must_use]
    pub fn first_text(&self) -> &str {
        match self.content.first() {
            Some(ToolContent::Text { text }) => text.as_str(),
            None => "",
        }
    }
}

/// Why a tool call failed.
#[derive(Debug, thiserror::Error)]
enum ToolError {
    #[error("{0}")]
    Arguments(String),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl ToolError {
    /// Bad input from the caller, as opposed to a backend or data problem.
    const fn is_caller_error(&self) -> bool {
        match self {
            Self::Arguments(_) => true,
            Self::Analysis(e) => e.is_validation(),
        }
    }
}

type ToolOutcome = Result<String, ToolError>;

/// The MCP server, backed by an assembly/geometry collaborator `C`.
pub struct McpServer<C> {
    /// Current server state.
    state: ServerState,
    /// Negotiated protocol version (set after initialisation).
    protocol_version: Option<String>,
    /// Source of assembly definitions and part geometry.
    client: C,
}

impl<C> McpServer<C>
where
    C: AssemblySource + PartGeometrySource,
{
    /// Creates a new MCP server around `client`.
    #[must_use]
    pub const fn new(client: C) -> Self {
        Self {
            state: ServerState::AwaitingInit,
            protocol_version: None,
            client,
        }
    }

    /// Returns the current server state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Returns the protocol version agreed during initialisation.
    #[must_use]
    pub fn protocol_version(&self) -> Option<&str> {
        self.protocol_version.as_deref()
    }

    /// Returns the collaborator.
    #[must_use]
    pub const fn client(&self) -> &C {
        &self.client
    }

    /// Runs the MCP server over stdio with graceful shutdown handling.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn run(&mut self) -> std::io::Result<()> {
        let mut transport = StdioTransport::stdio();
        self.run_with_shutdown(&mut transport).await
    }

    /// Serves messages from `transport` until its reader is closed.
    ///
    /// No signal handling is installed.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn serve<R, W>(&mut self, transport: &mut Transport<R, W>) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        loop {
            let line_result = transport.read_line().await;
            if self.handle_transport_result(transport, line_result).await? {
                return Ok(());
            }
        }
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(unix)]
    async fn run_with_shutdown(&mut self, transport: &mut StdioTransport) -> std::io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt()).map_err(std::io::Error::other)?;
        let mut sigterm = signal(SignalKind::terminate()).map_err(std::io::Error::other)?;

        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    info!("Received SIGINT, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                _ = sigterm.recv() => {
                    info!("Received SIGTERM, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                line_result = transport.read_line() => {
                    if self.handle_transport_result(transport, line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Runs the main loop and handles shutdown.
    #[cfg(windows)]
    async fn run_with_shutdown(&mut self, transport: &mut StdioTransport) -> std::io::Result<()> {
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("Received Ctrl+C, initiating graceful shutdown");
                    self.state = ServerState::ShuttingDown;
                    return Ok(());
                }

                line_result = transport.read_line() => {
                    if self.handle_transport_result(transport, line_result).await? {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Handles the result from transport read.
    ///
    /// Returns `true` if the server should shut down.
    async fn handle_transport_result<R, W>(
        &mut self,
        transport: &mut Transport<R, W>,
        line_result: std::io::Result<Option<String>>,
    ) -> std::io::Result<bool>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let Some(line) = line_result? else {
            debug!("Input closed");
            self.state = ServerState::ShuttingDown;
            return Ok(true);
        };

        if line.trim().is_empty() {
            return Ok(false);
        }

        if let Some(reply) = self.handle_line(&line).await {
            transport.write_message(&reply).await?;
        }

        Ok(self.state == ServerState::ShuttingDown)
    }

    /// Handles a single line of input.
    ///
    /// Returns the reply to send, or `None` for notifications.
    pub async fn handle_line(&mut self, line: &str) -> Option<OutgoingMessage> {
        match parse_message(line) {
            Ok(IncomingMessage::Request(req)) => Some(self.handle_request(req).await),
            Ok(IncomingMessage::Notification(notif)) => {
                self.handle_notification(&notif);
                None
            }
            Err(error) => Some(error.into()),
        }
    }

    /// Handles an incoming request.
    async fn handle_request(&mut self, req: JsonRpcRequest) -> OutgoingMessage {
        debug!(id = %req.id, method = %req.method, "Request");

        let response = match req.method.as_str() {
            "initialize" => self.handle_initialize(&req),
            "tools/list" => self.handle_tools_list(&req),
            "tools/call" => self.handle_tools_call(&req).await,
            "ping" => Ok(Self::handle_ping(&req)),
            _ => Err(JsonRpcError::method_not_found(req.id.clone(), &req.method)),
        };

        match response {
            Ok(resp) => resp.into(),
            Err(error) => error.into(),
        }
    }

    /// Handles an incoming notification.
    fn handle_notification(&mut self, notif: &JsonRpcNotification) {
        if notif.method == "notifications/initialized" && self.state == ServerState::Initialising {
            info!("Client initialised");
            self.state = ServerState::Running;
        }
    }

    /// Handles the initialize request.
    fn handle_initialize(&mut self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        if self.state != ServerState::AwaitingInit {
            return Err(JsonRpcError::already_initialised(req.id.clone()));
        }

        let params: InitializeParams = req
            .params
            .as_ref()
            .map(|p| serde_json::from_value(p.clone()))
            .transpose()
            .map_err(|e| {
                JsonRpcError::invalid_params(
                    req.id.clone(),
                    format!("Invalid initialize params: {e}"),
                )
            })?
            .ok_or_else(|| {
                JsonRpcError::invalid_params(req.id.clone(), "Missing initialize params")
            })?;

        debug!(
            requested = %params.protocol_version,
            client = params.client_info.as_ref().map_or("unknown", |c| c.name.as_str()),
            "Initialize request"
        );

        let negotiated_version = MCP_PROTOCOL_VERSION.to_string();

        self.protocol_version = Some(negotiated_version.clone());
        self.state = ServerState::Initialising;

        let result = json!({
            "protocolVersion": negotiated_version,
            "capabilities": ServerCapabilities::default(),
            "serverInfo": ServerInfo::default(),
        });

        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    /// Handles the tools/list request.
    fn handle_tools_list(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        let result = json!({
            "tools": tool_definitions(),
        });

        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    /// Handles the tools/call request.
    async fn handle_tools_call(
        &self,
        req: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;

        let params: ToolCallParams = req
            .params
            .as_ref()
            .map(|p| serde_json::from_value(p.clone()))
            .transpose()
            .map_err(|e| {
                JsonRpcError::invalid_params(
                    req.id.clone(),
                    format!("Invalid tool call params: {e}"),
                )
            })?
            .ok_or_else(|| {
                JsonRpcError::invalid_params(req.id.clone(), "Missing tool call params")
            })?;

        let result = self.call_tool(&params.name, &params.arguments).await;

        let result_value = serde_json::to_value(&result).map_err(|e| {
            tracing::error!(error = %e, "Failed to serialise tool call result");
            JsonRpcError::internal_error(
                req.id.clone(),
                "Internal error: failed to serialise result",
            )
        })?;

        Ok(JsonRpcResponse::success(req.id.clone(), result_value))
    }

    /// Handles the ping request.
    fn handle_ping(req: &JsonRpcRequest) -> JsonRpcResponse {
        JsonRpcResponse::success(req.id.clone(), json!({}))
    }

    /// Ensures the server is in the Running state.
    fn require_running(&self, id: &RequestId) -> Result<(), JsonRpcError> {
        if self.state != ServerState::Running {
            return Err(JsonRpcError::not_initialised(id.clone()));
        }
        Ok(())
    }

    /// Runs a tool by name.
    ///
    /// Failures are reported as error results whose text starts with
    /// `"Error: "`; unknown tools are reported the same way.
    pub async fn call_tool(&self, name: &str, arguments: &Value) -> ToolCallResult {
        info!(tool = name, "Tool call");

        let outcome = match name {
            "get_assembly" => self.call_get_assembly(arguments).await,
            "check_assembly_interference" => self.call_check_interference(arguments).await,
            "get_assembly_positions" => self.call_get_positions(arguments).await,
            "set_instance_position" => self.call_set_instance_position(arguments).await,
            "align_instance_to_face" => self.call_align_instance_to_face(arguments).await,
            "transform_instance" => self.call_transform_instance(arguments).await,
            _ => return ToolCallResult::error(format!("Error: Unknown tool: {name}")),
        };

        match outcome {
            Ok(text) => ToolCallResult::text(text),
            Err(e) => {
                if e.is_caller_error() {
                    info!(tool = name, error = %e, "Tool call rejected");
                } else {
                    warn!(tool = name, error = %e, "Tool call failed");
                }
                ToolCallResult::error(format!("Error: {e}"))
            }
        }
    }

    async fn call_get_assembly(&self, arguments: &Value) -> ToolOutcome {
        let assembly = element_path(arguments)?;
        let definition = self
            .client
            .get_assembly_definition(&assembly)
            .await
            .map_err(AnalysisError::from)?;
        Ok(format_assembly_summary(&definition))
    }

    async fn call_check_interference(&self, arguments: &Value) -> ToolOutcome {
        let assembly = element_path(arguments)?;
        let result = check_interference(&self.client, &self.client, &assembly).await?;
        Ok(format_interference_result(&result))
    }

    async fn call_get_positions(&self, arguments: &Value) -> ToolOutcome {
        let assembly = element_path(arguments)?;
        Ok(get_positions(&self.client, &self.client, &assembly).await?)
    }

    async fn call_set_instance_position(&self, arguments: &Value) -> ToolOutcome {
        let assembly = element_path(arguments)?;
        let instance_id = required_str(arguments, "instanceId")?;
        let position = [
            required_f64(arguments, "x")?,
            required_f64(arguments, "y")?,
            required_f64(arguments, "z")?,
        ];
        Ok(set_absolute_position(&self.client, &assembly, instance_id, position).await?)
    }

    async fn call_align_instance_to_face(&self, arguments: &Value) -> ToolOutcome {
        let assembly = element_path(arguments)?;
        let source_id = required_str(arguments, "sourceInstanceId")?;
        let target_id = required_str(arguments, "targetInstanceId")?;
        let face = required_str(arguments, "face")?;
        Ok(align_to_face(
            &self.client,
            &self.client,
            &assembly,
            source_id,
            target_id,
            face,
        )
        .await?)
    }

    async fn call_transform_instance(&self, arguments: &Value) -> ToolOutcome {
        let assembly = element_path(arguments)?;
        let instance_id = required_str(arguments, "instanceId")?;
        let translation = [
            optional_f64(arguments, "translateX")?,
            optional_f64(arguments, "translateY")?,
            optional_f64(arguments, "translateZ")?,
        ];
        let rotation = [
            optional_f64(arguments, "rotateX")?,
            optional_f64(arguments, "rotateY")?,
            optional_f64(arguments, "rotateZ")?,
        ];
        Ok(transform_instance(&self.client, &assembly, instance_id, translation, rotation).await?)
    }
}

fn required_str<'a>(arguments: &'a Value, name: &str) -> Result<&'a str, ToolError> {
    arguments
        .get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ToolError::Arguments(format!("Missing required parameter: {name}")))
}

fn required_f64(arguments: &Value, name: &str) -> Result<f64, ToolError> {
    match arguments.get(name) {
        None | Some(Value::Null) => Err(ToolError::Arguments(format!(
            "Missing required parameter: {name}"
        ))),
        Some(value) => value
            .as_f64()
            .ok_or_else(|| ToolError::Arguments(format!("Parameter {name} must be a number"))),
    }
}

/// A numeric argument that defaults to zero when absent.
fn optional_f64(arguments: &Value, name: &str) -> Result<f64, ToolError> {
    match arguments.get(name) {
        None | Some(Value::Null) => Ok(0.0),
        Some(_) => required_f64(arguments, name),
    }
}

fn element_path(arguments: &Value) -> Result<ElementPath, ToolError> {
    Ok(ElementPath::new(
        required_str(arguments, "documentId")?,
        required_str(arguments, "workspaceId")?,
        required_str(arguments, "elementId")?,
    ))
}

/// Schema properties shared by every tool: the assembly's element path.
fn assembly_properties() -> serde_json::Map<String, Value> {
    let mut props = serde_json::Map::new();
    props.insert(
        "documentId".to_string(),
        json!({"type": "string", "description": "Document ID"}),
    );
    props.insert(
        "workspaceId".to_string(),
        json!({"type": "string", "description": "Workspace ID"}),
    );
    props.insert(
        "elementId".to_string(),
        json!({"type": "string", "description": "Assembly element ID"}),
    );
    props
}

fn assembly_tool(name: &str, description: &str, extra: &[(&str, Value)]) -> ToolDefinition {
    let mut properties = assembly_properties();
    let mut required = vec!["documentId", "workspaceId", "elementId"];
    for (key, schema) in extra {
        properties.insert((*key).to_string(), schema.clone());
        required.push(*key);
    }

    ToolDefinition {
        name: name.to_string(),
        description: Some(description.to_string()),
        input_schema: json!({
            "type": "object",
            "properties": properties,
            "required": required,
        }),
    }
}

/// Adds properties that callers may leave out.
fn with_optional(mut tool: ToolDefinition, optional: &[(&str, Value)]) -> ToolDefinition {
    for (key, schema) in optional {
        tool.input_schema["properties"][*key] = schema.clone();
    }
    tool
}

/// Returns the list of available tools.
#[must_use]
pub fn tool_definitions() -> Vec<ToolDefinition> {
    let inches = |axis: &str| {
        json!({
            "type": "number",
            "description": format!("{axis} position in inches")
        })
    };
    let offset = |axis: &str| {
        json!({
            "type": "number",
            "description": format!("{axis} translation in inches (default 0)")
        })
    };
    let degrees = |axis: &str| {
        json!({
            "type": "number",
            "description": format!("Rotation about {axis} in degrees (default 0)")
        })
    };

    vec![
        assembly_tool(
            "get_assembly",
            "List the instances of an Onshape assembly with their types and IDs.",
            &[],
        ),
        assembly_tool(
            "check_assembly_interference",
            "Check an assembly for overlapping parts using axis-aligned bounding boxes. \
             Reports each overlapping pair with penetration depth and overlap volume in \
             inches. Bounding-box overlap may include false positives for non-box shapes.",
            &[],
        ),
        assembly_tool(
            "get_assembly_positions",
            "Report the position, size and world bounds of every part instance in an \
             assembly, in inches.",
            &[],
        ),
        assembly_tool(
            "set_instance_position",
            "Move an instance to an absolute position in inches. Any existing rotation \
             of the instance is reset.",
            &[
                (
                    "instanceId",
                    json!({"type": "string", "description": "Instance ID to move"}),
                ),
                ("x", inches("X")),
                ("y", inches("Y")),
                ("z", inches("Z")),
            ],
        ),
        assembly_tool(
            "align_instance_to_face",
            "Move a source instance so it sits flush against a face of a target \
             instance's bounding box. Only the axis normal to the face changes.",
            &[
                (
                    "sourceInstanceId",
                    json!({"type": "string", "description": "Instance ID to move"}),
                ),
                (
                    "targetInstanceId",
                    json!({"type": "string", "description": "Instance ID to align against"}),
                ),
                (
                    "face",
                    json!({
                        "type": "string",
                        "enum": ["front", "back", "left", "right", "top", "bottom"],
                        "description": "Face of the target: front/back (Y), left/right (X), \
                                        bottom/top (Z)"
                    }),
                ),
            ],
        ),
        with_optional(
            assembly_tool(
                "transform_instance",
                "Move and rotate an instance relative to its current placement. \
                 Translation is in inches, rotation in degrees, applied about X, then Y, \
                 then Z.",
                &[(
                    "instanceId",
                    json!({"type": "string", "description": "Instance ID to transform"}),
                )],
            ),
            &[
                ("translateX", offset("X")),
                ("translateY", offset("Y")),
                ("translateZ", offset("Z")),
                ("rotateX", degrees("X")),
                ("rotateY", degrees("Y")),
                ("rotateZ", degrees("Z")),
            ],
        ),
    ]
}
