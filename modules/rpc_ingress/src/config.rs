use serde::{Deserialize, Serialize};

/// Configuration for the rpc_ingress module (`modules.rpc_ingress`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RpcIngressConfig {
    /// Dispatch route; the document and clients live below it.
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default = "default_version")]
    pub version: String,
    /// Upper bound for one handler call; 0 disables the limit.
    #[serde(default = "default_handler_timeout_ms")]
    pub handler_timeout_ms: u64,
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Origin baked into generated clients. Defaults to the server bind address.
    #[serde(default)]
    pub client_base_url: Option<String>,
}

impl Default for RpcIngressConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            title: default_title(),
            version: default_version(),
            handler_timeout_ms: default_handler_timeout_ms(),
            max_body_bytes: default_max_body_bytes(),
            client_base_url: None,
        }
    }
}

impl RpcIngressConfig {
    /// `path` with exactly one leading slash and no trailing slash.
    pub fn route_path(&self) -> String {
        let trimmed = self.path.trim().trim_matches('/');
        format!("/{trimmed}")
    }

    pub fn handler_timeout(&self) -> Option<std::time::Duration> {
        (self.handler_timeout_ms > 0)
            .then(|| std::time::Duration::from_millis(self.handler_timeout_ms))
    }
}

fn default_path() -> String {
    "/jrpc".to_string()
}

fn default_title() -> String {
    "JRPC".to_string()
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_handler_timeout_ms() -> u64 {
    30_000
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}
