//! The JSON-RPC 2.0 envelope shared by all three transports.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON-RPC request. `id` is `None` for a notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// The request id, or absent for a fire-and-forget notification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// The method name.
    pub method: String,
    /// The method's parameters, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Build a request expecting exactly one response.
    #[must_use]
    pub fn call(id: u64, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id),
            method: method.into(),
            params: Some(params),
        }
    }

    /// Build a fire-and-forget notification.
    #[must_use]
    pub fn notification(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: None,
            method: method.into(),
            params: Some(params),
        }
    }
}

/// A JSON-RPC response: exactly one of `result` or `error` is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// The id of the request this answers.
    pub id: Option<u64>,
    /// The successful result, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The error, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Build a success response.
    #[must_use]
    pub fn success(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    /// Build an error response.
    #[must_use]
    pub fn failure(id: Option<u64>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Unwrap into `Ok(result)` or `Err(error)`.
    ///
    /// # Errors
    /// Returns the error payload if the response carries one.
    pub fn into_result(self) -> Result<Value, JsonRpcError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// A JSON-RPC error object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// The numeric error code.
    pub code: i64,
    /// A short human-readable message.
    pub message: String,
    /// Additional structured detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// `-32700`, reserved for unparseable frames.
    pub const PARSE_ERROR: i64 = -32700;
    /// `-32601`, reserved for unrecognized methods.
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// `-32602`, reserved for malformed parameters.
    pub const INVALID_PARAMS: i64 = -32602;
    /// `-32603`, the generic internal-error code.
    pub const INTERNAL_ERROR: i64 = -32603;

    /// Build a method-not-found error for `method`.
    #[must_use]
    pub fn method_not_found(method: &str) -> Self {
        Self {
            code: Self::METHOD_NOT_FOUND,
            message: format!("method not found: {method}"),
            data: None,
        }
    }

    /// Build a parse-error for a frame that did not deserialize.
    #[must_use]
    pub fn parse_error(detail: &str) -> Self {
        Self {
            code: Self::PARSE_ERROR,
            message: format!("parse error: {detail}"),
            data: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_has_no_id() {
        let req = JsonRpcRequest::notification("shutdown", Value::Null);
        assert!(req.id.is_none());
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("id").is_none());
    }

    #[test]
    fn success_response_round_trips() {
        let resp = JsonRpcResponse::success(1, serde_json::json!({"ok": true}));
        let json = serde_json::to_string(&resp).unwrap();
        let back: JsonRpcResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(back.into_result().unwrap(), serde_json::json!({"ok": true}));
    }

    #[test]
    fn error_response_unwraps_to_err() {
        let resp = JsonRpcResponse::failure(Some(1), JsonRpcError::method_not_found("frobnicate"));
        assert!(resp.into_result().is_err());
    }
}
