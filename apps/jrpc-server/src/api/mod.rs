//! Demo API served by `jrpc-server`.

use rpckit::{Module, Schema};

mod math;
mod misc;

/// `{a: number, b: number}`, shared by the binary operations.
pub(crate) fn operands() -> Schema {
    Schema::object([("a", Schema::number()), ("b", Schema::number())])
}

#[derive(Debug, serde::Deserialize)]
pub(crate) struct Operands {
    pub a: f64,
    pub b: f64,
}

/// Root of the served tree.
pub fn build() -> Module {
    Module::new("api").add(misc::module()).add(math::module())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rpckit::{Dispatcher, RpcRequest};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn demo_scenarios() {
        let d = Dispatcher::new(Arc::new(build()));

        let resp = d.dispatch(RpcRequest::new("uppercase", json!("ab"))).await;
        assert_eq!(resp.result(), Some(&json!("AB")));

        let resp = d
            .dispatch(RpcRequest::new("division", json!({"a": 4, "b": 0})))
            .await;
        assert_eq!(resp.error(), Some("Division by zero"));

        let resp = d
            .dispatch(RpcRequest::new("division", json!({"a": 4, "b": 2})))
            .await;
        assert_eq!(resp.result(), Some(&json!(2.0)));

        let resp = d
            .dispatch(RpcRequest::new("addition", json!({"a": 1.5, "b": 2})))
            .await;
        assert_eq!(resp.result(), Some(&json!(3.5)));

        let resp = d
            .dispatch(RpcRequest::new("doesNotExist", json!(null)))
            .await;
        assert_eq!(resp.error(), Some("Endpoint doesNotExist not found"));
    }

    #[test]
    fn every_demo_schema_has_a_python_type() {
        use rpckit::codegen::{ClientGenerator, PythonClientGenerator};

        let doc = rpckit::Document::from_module(&build(), "JRPC", "test");
        let source = PythonClientGenerator::new("http://localhost:8000", "/jrpc")
            .generate(&doc)
            .unwrap();
        assert!(source.contains("class Pair(TypedDict):"));
        assert!(source.contains("def division(arg: {'a': float, 'b': float}) -> float:"));
        assert!(source.contains("def addition(arg: Pair) -> float:"));
    }
}
