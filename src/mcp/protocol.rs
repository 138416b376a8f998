//! JSON-RPC 2.0 framing for the MCP protocol.
//!
//! Each input line is parsed into an [`IncomingMessage`]. Requests carry an
//! `id` and get exactly one [`OutgoingMessage`] back; notifications have no
//! `id` and are never answered.
//!
//! MCP narrows JSON-RPC in one way that matters here: request IDs are strings
//! or integers, never `null`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The MCP protocol version this implementation supports.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name for capability negotiation.
pub const SERVER_NAME: &str = "onshape-mcp";

/// A JSON-RPC 2.0 request ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID.
    Number(i64),
    /// String request ID.
    String(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

/// A request: a message with an `id` that expects a reply.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol marker, `"2.0"`.
    pub jsonrpc: String,
    /// Echoed back in the reply.
    pub id: RequestId,
    /// Method name, e.g. `tools/call`.
    pub method: String,
    /// Method parameters, if any.
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Returns why the request is malformed, or `None` if it is well formed.
    #[must_use]
    pub fn validate(&self) -> Option<&'static str> {
        if self.jsonrpc != "2.0" {
            Some("jsonrpc field must be \"2.0\"")
        } else if self.method.is_empty() {
            Some("method field cannot be empty")
        } else {
            None
        }
    }
}

/// A notification: a one-way message with no `id`.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcNotification {
    /// Protocol marker, `"2.0"`.
    pub jsonrpc: String,
    /// Notification name, e.g. `notifications/initialized`.
    pub method: String,
    /// Notification parameters, if any.
    #[serde(default)]
    pub params: Option<Value>,
}

/// A successful reply.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    /// Always "2.0".
    pub jsonrpc: &'static str,
    /// The request ID this response corresponds to.
    pub id: RequestId,
    /// The method's result.
    pub result: Value,
}

impl JsonRpcResponse {
    /// Creates a new success response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Value is not const-compatible
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result,
        }
    }
}

/// The JSON-RPC 2.0 error codes this server emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// The line is not valid JSON.
    ParseError,
    /// Valid JSON, but not a valid request object, or not allowed in the
    /// current lifecycle state.
    InvalidRequest,
    /// Unknown method.
    MethodNotFound,
    /// Method parameters failed to decode.
    InvalidParams,
    /// The server failed to build a reply.
    InternalError,
}

impl ErrorCode {
    /// Numeric code on the wire.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
        }
    }

    const fn default_message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
        }
    }
}

/// The `error` member of an error reply.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcErrorData {
    /// Numeric error code.
    pub code: i32,
    /// Human-readable description.
    pub message: String,
}

impl JsonRpcErrorData {
    fn new(code: ErrorCode, message: Option<String>) -> Self {
        Self {
            code: code.code(),
            message: message.unwrap_or_else(|| code.default_message().to_string()),
        }
    }
}

/// An error reply.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    /// Always "2.0".
    pub jsonrpc: &'static str,
    /// The failed request's ID; absent when it could not be read.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    /// Code and message.
    pub error: JsonRpcErrorData,
}

impl JsonRpcError {
    fn new(id: Option<RequestId>, code: ErrorCode, message: Option<String>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            error: JsonRpcErrorData::new(code, message),
        }
    }

    /// The line could not be parsed, so the ID is unknown.
    #[must_use]
    pub fn parse_error() -> Self {
        Self::new(None, ErrorCode::ParseError, None)
    }

    /// The message is JSON but not a valid request.
    #[must_use]
    pub fn invalid_request(id: Option<RequestId>) -> Self {
        Self::new(id, ErrorCode::InvalidRequest, None)
    }

    /// Unknown method.
    #[must_use]
    pub fn method_not_found(id: RequestId, method: &str) -> Self {
        Self::new(
            Some(id),
            ErrorCode::MethodNotFound,
            Some(format!("Method not found: {method}")),
        )
    }

    /// Parameters failed to decode.
    #[must_use]
    pub fn invalid_params(id: RequestId, message: impl Into<String>) -> Self {
        Self::new(Some(id), ErrorCode::InvalidParams, Some(message.into()))
    }

    /// The server could not build its reply.
    #[must_use]
    pub fn internal_error(id: RequestId, message: impl Into<String>) -> Self {
        Self::new(Some(id), ErrorCode::InternalError, Some(message.into()))
    }

    /// A request other than `initialize` arrived before the handshake finished.
    #[must_use]
    pub fn not_initialised(id: RequestId) -> Self {
        Self::new(
            Some(id),
            ErrorCode::InvalidRequest,
            Some("Server not initialised".to_string()),
        )
    }

    /// A second `initialize` arrived.
    #[must_use]
    pub fn already_initialised(id: RequestId) -> Self {
        Self::new(
            Some(id),
            ErrorCode::InvalidRequest,
            Some("Server already initialised".to_string()),
        )
    }
}

/// A parsed input line.
#[derive(Debug, Clone)]
pub enum IncomingMessage {
    /// A request expecting a response.
    Request(JsonRpcRequest),
    /// A notification (no response expected).
    Notification(JsonRpcNotification),
}

/// A reply written back to the client.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum OutgoingMessage {
    /// A successful response.
    Response(JsonRpcResponse),
    /// An error response.
    Error(JsonRpcError),
}

impl OutgoingMessage {
    /// Returns the result payload of a successful response.
    #[must_use]
    pub const fn result(&self) -> Option<&Value> {
        match self {
            Self::Response(resp) => Some(&resp.result),
            Self::Error(_) => None,
        }
    }

    /// Returns the error details of an error response.
    #[must_use]
    pub const fn error(&self) -> Option<&JsonRpcErrorData> {
        match self {
            Self::Response(_) => None,
            Self::Error(err) => Some(&err.error),
        }
    }
}

impl From<JsonRpcResponse> for OutgoingMessage {
    fn from(resp: JsonRpcResponse) -> Self {
        Self::Response(resp)
    }
}

impl From<JsonRpcError> for OutgoingMessage {
    fn from(err: JsonRpcError) -> Self {
        Self::Error(err)
    }
}

/// Parses one input line.
///
/// The presence of an `id` member decides between request and notification.
///
/// # Errors
///
/// Returns a parse error for non-JSON or non-object input, and an invalid
/// request error for anything else that is not a JSON-RPC 2.0 message.
pub fn parse_message(json: &str) -> Result<IncomingMessage, JsonRpcError> {
    let value: Value = serde_json::from_str(json).map_err(|_| JsonRpcError::parse_error())?;
    let obj = value.as_object().ok_or_else(JsonRpcError::parse_error)?;

    if obj.get("jsonrpc").and_then(Value::as_str) != Some("2.0") {
        return Err(JsonRpcError::invalid_request(None));
    }

    if obj.contains_key("id") {
        let request: JsonRpcRequest =
            serde_json::from_value(value).map_err(|_| JsonRpcError::invalid_request(None))?;
        if request.validate().is_some() {
            return Err(JsonRpcError::invalid_request(Some(request.id)));
        }
        Ok(IncomingMessage::Request(request))
    } else {
        serde_json::from_value(value)
            .map(IncomingMessage::Notification)
            .map_err(|_| JsonRpcError::invalid_request(None))
    }
}
