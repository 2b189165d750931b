use std::sync::Arc;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use http::{header, StatusCode};
use rpckit::codegen::ClientGenerator;
use rpckit::{RpcRequest, RpcResponse};

use crate::IngressState;

pub(crate) const INVALID_REQUEST: &str = "Invalid request";

/// `POST {path}`: one call in, one envelope out.
///
/// Protocol failures (unknown endpoint, invalid input, handler errors) are
/// regular envelopes with status 200; only an undecodable body is a 400.
pub(crate) async fn dispatch(State(state): State<Arc<IngressState>>, body: Bytes) -> Response {
    let request: RpcRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::debug!(error = %e, "Rejecting undecodable request body");
            return (
                StatusCode::BAD_REQUEST,
                Json(RpcResponse::failure(INVALID_REQUEST)),
            )
                .into_response();
        }
    };

    Json(state.dispatcher.dispatch(request).await).into_response()
}

/// `GET {path}/openjrpc.json`
pub(crate) async fn document(State(state): State<Arc<IngressState>>) -> Response {
    (
        [(header::CACHE_CONTROL, "no-store")],
        Json(state.document.as_ref()),
    )
        .into_response()
}

/// `GET {path}/clients/python`
pub(crate) async fn python_client(State(state): State<Arc<IngressState>>) -> Response {
    match state.python.generate(&state.document) {
        Ok(source) => (
            [(header::CONTENT_TYPE, state.python.content_type())],
            source,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Python client generation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
