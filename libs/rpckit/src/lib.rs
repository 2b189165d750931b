//! # RpcKit - Schema-validated remote procedures
//!
//! Declare remote procedures as typed, schema-checked endpoints, group them
//! into a module tree and get three things for free:
//!
//! - **Dispatch**: a [`Dispatcher`] that validates every argument and every
//!   result and answers with a uniform `{error, result}` envelope
//! - **Introspection**: a serializable [`Document`] describing the whole tree,
//!   with schemas paired to human-readable model aliases
//! - **Clients**: generated client bindings derived from the document
//!   (see [`codegen`])
//!
//! ## Example
//!
//! ```rust,ignore
//! use rpckit::{Dispatcher, Endpoint, Module, RpcRequest, Schema};
//! use std::sync::Arc;
//!
//! let misc = Module::new("misc").add(
//!     Endpoint::new("uppercase", Schema::string(), Schema::string(), |s: String| async move {
//!         anyhow::Ok(s.to_uppercase())
//!     })
//!     .summary("Convert a string to uppercase"),
//! );
//!
//! let dispatcher = Dispatcher::new(Arc::new(Module::new("api").add(misc)));
//! let response = dispatcher
//!     .dispatch(RpcRequest::new("uppercase", serde_json::json!("ab")))
//!     .await;
//! assert_eq!(response.result(), Some(&serde_json::json!("AB")));
//! ```
//!
//! ## Resolution rules
//!
//! Endpoint names are unique per module (last registration wins). Dispatch
//! searches the tree depth-first: a module's own endpoints first, then each
//! submodule in declaration order. The first match answers.

pub use anyhow::Result;
pub use async_trait::async_trait;

pub mod codegen;
pub mod dispatch;
pub mod endpoint;
pub mod envelope;
pub mod error;
pub mod introspection;
pub mod module;
pub mod schema;

pub use dispatch::{DispatchOptions, Dispatcher};
pub use endpoint::{Endpoint, Handler};
pub use envelope::{RpcRequest, RpcResponse};
pub use error::{DispatchError, HandlerError, UNKNOWN_ERROR};
pub use introspection::{Document, FunctionDescription, ModelDescription, ModuleDescription};
pub use module::{Module, Node};
pub use schema::{Schema, SchemaError, ValidationFailure};
