//! JSON-RPC 2.0 envelope types and error codes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Protocol version tag carried by every response.
pub const JSONRPC_VERSION: &str = "2.0";

/// Request text is not valid JSON or lacks required envelope fields.
pub const PARSE_ERROR: i32 = -32700;

/// The requested method is not in the dispatch table.
pub const METHOD_NOT_FOUND: i32 = -32601;

/// Classification failed: bad base64, undecodable image, malformed labels,
/// or a scorer failure.
pub const APPLICATION_ERROR: i32 = -32000;

/// A validated request envelope.
///
/// `id` stays raw JSON so any value round-trips; `params` stays opaque
/// until the method handler interprets it.
#[derive(Debug)]
pub struct RpcRequest {
    pub method: String,
    pub params: Value,
    pub id: Value,
}

impl RpcRequest {
    /// Validate a parsed JSON value as a request envelope.
    ///
    /// On failure returns the complete `-32700` response to send back,
    /// echoing the `id` when one was present.
    pub fn from_value(parsed: Value) -> Result<Self, RpcResponse> {
        // Pull the id out first so malformed envelopes still echo it.
        let id = parsed.get("id").cloned().unwrap_or(Value::Null);

        let Value::Object(mut fields) = parsed else {
            return Err(RpcResponse::failure(
                id,
                PARSE_ERROR,
                "Invalid request: expected a JSON object",
            ));
        };
        if !fields.contains_key("id") {
            return Err(RpcResponse::failure(
                id,
                PARSE_ERROR,
                "Invalid request: missing id",
            ));
        }
        let method = match fields.get("method") {
            Some(Value::String(method)) => method.clone(),
            Some(_) => {
                return Err(RpcResponse::failure(
                    id,
                    PARSE_ERROR,
                    "Invalid request: method must be a string",
                ))
            }
            None => {
                return Err(RpcResponse::failure(
                    id,
                    PARSE_ERROR,
                    "Invalid request: missing method",
                ))
            }
        };
        let Some(params) = fields.remove("params") else {
            return Err(RpcResponse::failure(
                id,
                PARSE_ERROR,
                "Invalid request: missing params",
            ));
        };

        Ok(Self { method, params, id })
    }
}

/// A response envelope.
///
/// Carries the protocol version, the request's `id` echoed verbatim, and
/// exactly one of `result` / `error` (the constructors enforce this).
#[derive(Debug, Clone, Serialize)]
pub struct RpcResponse {
    pub jsonrpc: &'static str,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,

    /// Opaque echo of the request id: any JSON type, compared by value.
    pub id: Value,
}

/// The error member of a failed response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
}

impl RpcResponse {
    /// Build a success envelope.
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            result: Some(result),
            error: None,
            id,
        }
    }

    /// Build an error envelope.
    pub fn failure(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
            id,
        }
    }
}
