//! HTTP binding for an rpckit module tree.
//!
//! Routes (relative to the configured `path`, `/jrpc` by default):
//!
//! - `POST {path}` dispatches `{name, argument}` (or `{name, arg}`)
//! - `GET {path}/openjrpc.json` serves the introspection document
//! - `GET {path}/clients/python` serves a generated Python client

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use rpckit::codegen::PythonClientGenerator;
use rpckit::{DispatchOptions, Dispatcher, Document, Module};
use rpckit_bootstrap::{ConfigProvider, ConfigProviderExt};
use tokio_util::sync::CancellationToken;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

mod config;
mod web;

pub use config::RpcIngressConfig;

pub const MODULE_NAME: &str = "rpc_ingress";

/// Shared by every request handler.
pub(crate) struct IngressState {
    pub(crate) dispatcher: Dispatcher,
    pub(crate) document: Arc<Document>,
    pub(crate) python: PythonClientGenerator,
}

/// Owns the HTTP surface for one frozen module tree.
pub struct RpcIngress {
    config: RpcIngressConfig,
    state: Arc<IngressState>,
}

impl RpcIngress {
    /// `default_base_url` is used for generated clients unless the config
    /// sets `client_base_url`.
    pub fn new(root: Arc<Module>, config: RpcIngressConfig, default_base_url: &str) -> Self {
        let dispatcher = Dispatcher::with_options(
            root.clone(),
            DispatchOptions {
                handler_timeout: config.handler_timeout(),
            },
        );
        // Built once; the tree never changes after this point.
        let document = Arc::new(Document::from_module(
            &root,
            config.title.clone(),
            config.version.clone(),
        ));
        let base_url = config
            .client_base_url
            .as_deref()
            .unwrap_or(default_base_url);
        let python = PythonClientGenerator::new(base_url, config.route_path());

        tracing::debug!(
            module = MODULE_NAME,
            path = %config.route_path(),
            endpoints = root.walk_endpoints().len(),
            "RPC ingress initialized"
        );

        Self {
            config,
            state: Arc::new(IngressState {
                dispatcher,
                document,
                python,
            }),
        }
    }

    /// Read `modules.rpc_ingress` from `provider` and build the ingress.
    pub fn from_provider(
        root: Arc<Module>,
        provider: &dyn ConfigProvider,
        default_base_url: &str,
    ) -> Result<Self> {
        let config: RpcIngressConfig = provider.module_config(MODULE_NAME)?;
        Ok(Self::new(root, config, default_base_url))
    }

    pub fn config(&self) -> &RpcIngressConfig {
        &self.config
    }

    pub fn document(&self) -> &Document {
        &self.state.document
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.state.dispatcher
    }

    pub fn python_client(&self) -> Result<String, rpckit::codegen::CodegenError> {
        use rpckit::codegen::ClientGenerator;
        self.state.python.generate(&self.state.document)
    }

    pub fn router(&self) -> Router {
        let path = self.config.route_path();
        let below = |suffix: &str| {
            if path == "/" {
                format!("/{suffix}")
            } else {
                format!("{path}/{suffix}")
            }
        };

        Router::new()
            .route(&path, post(web::dispatch))
            .route(&below("openjrpc.json"), get(web::document))
            .route(&below("clients/python"), get(web::python_client))
            .route("/healthz", get(|| async { "ok" }))
            .layer(DefaultBodyLimit::disable())
            .layer(RequestBodyLimitLayer::new(self.config.max_body_bytes))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(|req: &axum::http::Request<axum::body::Body>| {
                        tracing::info_span!(
                            "http_request",
                            method = %req.method(),
                            uri = %req.uri().path(),
                            module = MODULE_NAME,
                            status = tracing::field::Empty,
                            latency_ms = tracing::field::Empty,
                        )
                    })
                    .on_response(
                        |res: &axum::http::Response<axum::body::Body>,
                         latency: std::time::Duration,
                         span: &tracing::Span| {
                            span.record("status", res.status().as_u16());
                            span.record("latency_ms", latency.as_millis() as u64);
                        },
                    ),
            )
            .with_state(self.state.clone())
    }

    /// Bind and serve until `cancel` fires.
    pub async fn serve(&self, addr: SocketAddr, cancel: CancellationToken) -> Result<()> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!(
            %addr,
            path = %self.config.route_path(),
            "HTTP server bound"
        );

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
                tracing::info!("HTTP server shutting down gracefully (cancellation)");
            })
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use rpckit::{Endpoint, Schema};
    use serde::Deserialize;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    #[derive(Deserialize)]
    struct Operands {
        a: f64,
        b: f64,
    }

    fn operands() -> Schema {
        Schema::object([("a", Schema::number()), ("b", Schema::number())])
    }

    fn tree() -> Arc<Module> {
        let misc = Module::new("misc")
            .add(
                Endpoint::new("uppercase", Schema::string(), Schema::string(), |s: String| async move {
                    anyhow::Ok(s.to_uppercase())
                })
                .summary("Converts a string to uppercase"),
            )
            .add(Endpoint::new(
                "division",
                operands(),
                Schema::number(),
                |o: Operands| async move {
                    if o.b == 0.0 {
                        anyhow::bail!("Division by zero");
                    }
                    anyhow::Ok(o.a / o.b)
                },
            ));
        let math = Module::new("math")
            .declare_models([("Pair", operands())])
            .add(Endpoint::new(
                "addition",
                operands(),
                Schema::number(),
                |o: Operands| async move { anyhow::Ok(o.a + o.b) },
            ));
        Arc::new(Module::new("api").add(misc).add(math))
    }

    fn ingress(config: RpcIngressConfig) -> RpcIngress {
        RpcIngress::new(tree(), config, "http://localhost:8000")
    }

    async fn send(router: Router, req: Request<Body>) -> (StatusCode, Vec<u8>) {
        let res = router.oneshot(req).await.unwrap();
        let status = res.status();
        let body = res.into_body().collect().await.unwrap().to_bytes().to_vec();
        (status, body)
    }

    async fn call(router: Router, body: Value) -> (StatusCode, Value) {
        let req = Request::post("/jrpc")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let (status, bytes) = send(router, req).await;
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn dispatches_with_short_argument_field() {
        let router = ingress(RpcIngressConfig::default()).router();
        let (status, body) = call(router, json!({"name": "uppercase", "arg": "ab"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"error": null, "result": "AB"}));
    }

    #[tokio::test]
    async fn dispatches_with_long_argument_field() {
        let router = ingress(RpcIngressConfig::default()).router();
        let (_, body) = call(router, json!({"name": "addition", "argument": {"a": 1, "b": 2}})).await;
        assert_eq!(body["result"], json!(3.0));
    }

    #[tokio::test]
    async fn protocol_errors_are_envelopes() {
        let router = ingress(RpcIngressConfig::default()).router();

        let (status, body) =
            call(router.clone(), json!({"name": "division", "arg": {"a": 4, "b": 0}})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"error": "Division by zero", "result": null}));

        let (_, body) = call(router.clone(), json!({"name": "doesNotExist", "arg": 1})).await;
        assert_eq!(body["error"], "Endpoint doesNotExist not found");

        let (_, body) = call(router, json!({"name": "uppercase", "arg": 5})).await;
        assert_eq!(body["error"], "Invalid input");
    }

    #[tokio::test]
    async fn undecodable_body_is_bad_request() {
        let router = ingress(RpcIngressConfig::default()).router();
        let req = Request::post("/jrpc")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, bytes) = send(router, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({"error": "Invalid request", "result": null}));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let config = RpcIngressConfig {
            max_body_bytes: 64,
            ..RpcIngressConfig::default()
        };
        let router = ingress(config).router();
        let body = json!({"name": "uppercase", "arg": "x".repeat(256)}).to_string();
        let req = Request::post("/jrpc")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .unwrap();
        let (status, _) = send(router, req).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn serves_document() {
        let router = ingress(RpcIngressConfig::default()).router();
        let req = Request::get("/jrpc/openjrpc.json").body(Body::empty()).unwrap();
        let res = router.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[header::CACHE_CONTROL], "no-store");

        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let doc: Document = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(doc.title, "JRPC");
        assert_eq!(doc.root.name, "api");
        assert_eq!(
            doc.root.submodules[1].functions[0].input_alias_name.as_deref(),
            Some("Pair")
        );
    }

    #[tokio::test]
    async fn serves_python_client() {
        let router = ingress(RpcIngressConfig::default()).router();
        let req = Request::get("/jrpc/clients/python").body(Body::empty()).unwrap();
        let res = router.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/x-python"));

        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let source = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(source.contains("requests.post('http://localhost:8000/jrpc'"));
        assert!(source.contains("def addition(arg: Pair) -> float:"));
    }

    #[tokio::test]
    async fn python_generation_failure_is_server_error() {
        let root = Arc::new(Module::new("api").add(Endpoint::new(
            "ping",
            Schema::null(),
            Schema::string(),
            |_: ()| async { anyhow::Ok("pong") },
        )));
        let router = RpcIngress::new(root, RpcIngressConfig::default(), "http://h").router();
        let req = Request::get("/jrpc/clients/python").body(Body::empty()).unwrap();
        let (status, bytes) = send(router, req).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(String::from_utf8(bytes).unwrap(), "Type null not supported");
    }

    #[tokio::test]
    async fn custom_path_and_base_url() {
        let config = RpcIngressConfig {
            path: "rpc/".into(),
            client_base_url: Some("https://api.example.org".into()),
            ..RpcIngressConfig::default()
        };
        let ing = ingress(config);
        assert!(ing
            .python_client()
            .unwrap()
            .contains("requests.post('https://api.example.org/rpc'"));

        let req = Request::post("/rpc")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json!({"name": "uppercase", "arg": "x"}).to_string()))
            .unwrap();
        let (status, bytes) = send(ing.router(), req).await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["result"], "X");
    }

    #[tokio::test]
    async fn reads_config_from_provider() {
        let mut app = rpckit_bootstrap::AppConfig::default();
        app.modules.insert(
            MODULE_NAME.to_string(),
            json!({"title": "Demo API", "version": "9.9.9"}),
        );
        let provider = rpckit_bootstrap::AppConfigProvider::new(app);

        let ing = RpcIngress::from_provider(tree(), &provider, "http://localhost:8000").unwrap();
        assert_eq!(ing.document().title, "Demo API");
        assert_eq!(ing.document().version, "9.9.9");
    }
}
