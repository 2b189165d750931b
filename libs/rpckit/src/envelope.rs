//! Wire types for one call: the `{name, argument}` request and the
//! `{error, result}` response envelope.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DispatchError;

/// A single call. `arg` is accepted as an alias of `argument`; a missing
/// argument decodes as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub name: String,
    #[serde(default, alias = "arg")]
    pub argument: Value,
}

impl RpcRequest {
    pub fn new(name: impl Into<String>, argument: Value) -> Self {
        Self {
            name: name.into(),
            argument,
        }
    }
}

/// Outcome of one call. Serializes as `{"error": ..., "result": ...}`.
///
/// `error` is non-null exactly for failures. A success whose result is
/// itself `null` (an endpoint with a `null` output schema) serializes as
/// `{"error": null, "result": null}`; clients tell outcomes apart by
/// `error` alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "EnvelopeWire", from = "EnvelopeWire")]
pub enum RpcResponse {
    Success(Value),
    Failure(String),
}

#[derive(Serialize, Deserialize)]
struct EnvelopeWire {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    result: Value,
}

impl From<RpcResponse> for EnvelopeWire {
    fn from(resp: RpcResponse) -> Self {
        match resp {
            RpcResponse::Success(result) => Self {
                error: None,
                result,
            },
            RpcResponse::Failure(error) => Self {
                error: Some(error),
                result: Value::Null,
            },
        }
    }
}

impl From<EnvelopeWire> for RpcResponse {
    fn from(wire: EnvelopeWire) -> Self {
        match wire.error {
            Some(error) => RpcResponse::Failure(error),
            None => RpcResponse::Success(wire.result),
        }
    }
}

impl From<Result<Value, DispatchError>> for RpcResponse {
    fn from(outcome: Result<Value, DispatchError>) -> Self {
        match outcome {
            Ok(value) => RpcResponse::Success(value),
            Err(err) => RpcResponse::Failure(err.to_string()),
        }
    }
}

impl RpcResponse {
    pub fn success(result: Value) -> Self {
        RpcResponse::Success(result)
    }

    pub fn failure(message: impl Into<String>) -> Self {
        RpcResponse::Failure(message.into())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RpcResponse::Success(_))
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            RpcResponse::Failure(msg) => Some(msg),
            RpcResponse::Success(_) => None,
        }
    }

    pub fn result(&self) -> Option<&Value> {
        match self {
            RpcResponse::Success(value) => Some(value),
            RpcResponse::Failure(_) => None,
        }
    }

    pub fn into_result(self) -> Result<Value, String> {
        match self {
            RpcResponse::Success(value) => Ok(value),
            RpcResponse::Failure(msg) => Err(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_accepts_short_field_name() {
        let req: RpcRequest = serde_json::from_value(json!({"name": "uppercase", "arg": "ab"})).unwrap();
        assert_eq!(req, RpcRequest::new("uppercase", json!("ab")));

        let req: RpcRequest =
            serde_json::from_value(json!({"name": "uppercase", "argument": "ab"})).unwrap();
        assert_eq!(req.argument, json!("ab"));
    }

    #[test]
    fn request_without_argument_is_null() {
        let req: RpcRequest = serde_json::from_value(json!({"name": "ping"})).unwrap();
        assert_eq!(req.argument, Value::Null);
    }

    #[test]
    fn envelope_shape() {
        let ok = serde_json::to_value(RpcResponse::success(json!("AB"))).unwrap();
        assert_eq!(ok, json!({"error": null, "result": "AB"}));

        let failed = serde_json::to_value(RpcResponse::failure("Division by zero")).unwrap();
        assert_eq!(failed, json!({"error": "Division by zero", "result": null}));
    }

    #[test]
    fn null_result_is_still_a_success() {
        let resp = RpcResponse::success(Value::Null);
        assert!(resp.is_success());
        assert_eq!(
            serde_json::to_value(&resp).unwrap(),
            json!({"error": null, "result": null})
        );
    }

    #[test]
    fn envelope_parses_back() {
        let resp: RpcResponse =
            serde_json::from_value(json!({"error": "Invalid input", "result": null})).unwrap();
        assert_eq!(resp.error(), Some("Invalid input"));
        assert!(!resp.is_success());

        let resp: RpcResponse = serde_json::from_value(json!({"error": null, "result": null})).unwrap();
        assert_eq!(resp.result(), Some(&Value::Null));
    }

    #[test]
    fn dispatch_error_becomes_failure() {
        let resp: RpcResponse = Err::<Value, _>(DispatchError::NotFound {
            name: "doesNotExist".into(),
        })
        .into();
        assert_eq!(resp.into_result(), Err("Endpoint doesNotExist not found".to_string()));
    }
}
