//! Request dispatch: resolve, validate, invoke, validate, wrap.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde_json::Value;

use crate::endpoint::Endpoint;
use crate::envelope::{RpcRequest, RpcResponse};
use crate::error::{DispatchError, UNKNOWN_ERROR};
use crate::module::Module;

/// Per-dispatcher knobs.
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    /// Upper bound on a single handler invocation. `None` waits forever.
    pub handler_timeout: Option<Duration>,
}

/// Answers calls against a frozen module tree.
///
/// Cheap to clone; the tree is shared, never copied. Any number of dispatches
/// may run concurrently.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    root: Arc<Module>,
    options: DispatchOptions,
}

impl Dispatcher {
    pub fn new(root: Arc<Module>) -> Self {
        Self::with_options(root, DispatchOptions::default())
    }

    pub fn with_options(root: Arc<Module>, options: DispatchOptions) -> Self {
        Self { root, options }
    }

    pub fn root(&self) -> &Arc<Module> {
        &self.root
    }

    /// Dispatch and wrap the outcome into the response envelope.
    #[tracing::instrument(name = "rpckit.dispatch", skip(self, request), fields(endpoint = %request.name))]
    pub async fn dispatch(&self, request: RpcRequest) -> RpcResponse {
        self.execute(request).await.into()
    }

    /// Dispatch and return the cleaned result or the protocol failure.
    pub async fn execute(&self, request: RpcRequest) -> Result<Value, DispatchError> {
        let RpcRequest { name, argument } = request;
        tracing::debug!(endpoint = %name, "Dispatching call");

        let Some(endpoint) = self.root.resolve(&name) else {
            tracing::warn!(endpoint = %name, "Endpoint not found");
            return Err(DispatchError::NotFound { name });
        };

        let input = endpoint.input().validate(argument).map_err(|failure| {
            tracing::warn!(endpoint = %name, reason = %failure, "Argument rejected");
            DispatchError::InvalidInput
        })?;

        let output = self.invoke(endpoint, input).await?;

        endpoint.output().validate(output).map_err(|failure| {
            tracing::warn!(endpoint = %name, reason = %failure, "Handler result rejected");
            DispatchError::InvalidOutput
        })
    }

    async fn invoke(&self, endpoint: &Endpoint, input: Value) -> Result<Value, DispatchError> {
        let call = AssertUnwindSafe(endpoint.handler().call(input)).catch_unwind();

        let outcome = match self.options.handler_timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                tracing::error!(
                    endpoint = %endpoint.name(),
                    timeout_ms = limit.as_millis() as u64,
                    "Handler timed out"
                );
                DispatchError::Timeout
            })?,
            None => call.await,
        };

        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(err)) => {
                tracing::error!(endpoint = %endpoint.name(), error = %err, "Handler failed");
                Err(err.into())
            }
            Err(payload) => {
                tracing::error!(
                    endpoint = %endpoint.name(),
                    panic = %panic_message(payload.as_ref()),
                    "Handler panicked"
                );
                Err(DispatchError::Handler {
                    message: UNKNOWN_ERROR.to_string(),
                })
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("<non-string panic payload>")
}
