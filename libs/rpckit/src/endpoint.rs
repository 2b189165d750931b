//! Endpoints: one named operation with input/output schemas and a handler.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::HandlerError;
use crate::schema::Schema;

/// Type-erased endpoint implementation.
///
/// Receives the argument after it was cleaned and validated against the input
/// schema; its return value is validated against the output schema before it
/// reaches the caller.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn call(&self, input: Value) -> Result<Value, HandlerError>;
}

/// Adapter from a typed async function to [`Handler`].
struct FnHandler<F, I, O> {
    func: F,
    _types: PhantomData<fn(I) -> O>,
}

#[async_trait]
impl<F, Fut, I, O> Handler for FnHandler<F, I, O>
where
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
    I: DeserializeOwned + Send + 'static,
    O: Serialize + Send + 'static,
{
    async fn call(&self, input: Value) -> Result<Value, HandlerError> {
        let input: I = serde_json::from_value(input).map_err(HandlerError::Decode)?;
        let output = (self.func)(input).await?;
        serde_json::to_value(output).map_err(HandlerError::Encode)
    }
}

/// One named, independently callable operation.
///
/// Immutable once it has been added to a [`Module`](crate::Module); cloning
/// shares the handler.
#[derive(Clone)]
pub struct Endpoint {
    name: String,
    summary: Option<String>,
    description: Option<String>,
    input: Schema,
    output: Schema,
    handler: Arc<dyn Handler>,
}

impl Endpoint {
    /// Build an endpoint from a typed async function.
    ///
    /// The cleaned argument is decoded into `I`; the returned `O` is encoded
    /// back to JSON. An `Err` from the function becomes the envelope error.
    pub fn new<F, Fut, I, O>(
        name: impl Into<String>,
        input: Schema,
        output: Schema,
        func: F,
    ) -> Self
    where
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<O>> + Send + 'static,
        I: DeserializeOwned + Send + 'static,
        O: Serialize + Send + 'static,
    {
        Self::with_handler(
            name,
            input,
            output,
            FnHandler {
                func,
                _types: PhantomData,
            },
        )
    }

    /// Build an endpoint from any [`Handler`] implementation.
    pub fn with_handler(
        name: impl Into<String>,
        input: Schema,
        output: Schema,
        handler: impl Handler,
    ) -> Self {
        Self {
            name: name.into(),
            summary: None,
            description: None,
            input,
            output,
            handler: Arc::new(handler),
        }
    }

    /// Set the one-line summary
    pub fn summary(mut self, text: impl Into<String>) -> Self {
        self.summary = Some(text.into());
        self
    }

    /// Set the long description
    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn summary_text(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn input(&self) -> &Schema {
        &self.input
    }

    pub fn output(&self) -> &Schema {
        &self.output
    }

    pub fn handler(&self) -> &Arc<dyn Handler> {
        &self.handler
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("summary", &self.summary)
            .field("has_description", &self.description.is_some())
            .field("input", &self.input)
            .field("output", &self.output)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Operands {
        a: f64,
        b: f64,
    }

    #[tokio::test]
    async fn typed_handler_decodes_and_encodes() {
        let ep = Endpoint::new(
            "addition",
            Schema::object([("a", Schema::number()), ("b", Schema::number())]),
            Schema::number(),
            |o: Operands| async move { anyhow::Ok(o.a + o.b) },
        );

        let out = ep.handler().call(json!({"a": 1, "b": 2})).await.unwrap();
        assert_eq!(out, json!(3.0));
    }

    #[tokio::test]
    async fn typed_handler_reports_decode_failure() {
        let ep = Endpoint::new(
            "addition",
            Schema::number(),
            Schema::number(),
            |o: Operands| async move { anyhow::Ok(o.a + o.b) },
        );

        let err = ep.handler().call(json!("nope")).await.unwrap_err();
        assert!(matches!(err, HandlerError::Decode(_)));
    }

    #[tokio::test]
    async fn typed_handler_forwards_failure_message() {
        let ep = Endpoint::new(
            "fail",
            Schema::null(),
            Schema::null(),
            |_: ()| async move { Err::<(), _>(anyhow::anyhow!("boom")) },
        );

        let err = ep.handler().call(Value::Null).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn descriptive_methods() {
        let ep = Endpoint::new("noop", Schema::null(), Schema::null(), |_: ()| async {
            anyhow::Ok(())
        })
        .summary("Does nothing")
        .description("Really, nothing at all");

        assert_eq!(ep.name(), "noop");
        assert_eq!(ep.summary_text(), Some("Does nothing"));
        assert_eq!(ep.description_text(), Some("Really, nothing at all"));
        assert_eq!(ep.input(), &Schema::null());
    }
}
