use crate::config::AppConfig;
use serde::de::DeserializeOwned;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration for module '{module}': {source}")]
    InvalidModuleConfig {
        module: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Read access to loaded configuration, as seen by a module.
pub trait ConfigProvider: Send + Sync {
    /// Raw `modules.<name>` entry
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value>;
}

pub trait ConfigProviderExt: ConfigProvider {
    /// Typed `modules.<name>` entry. A missing entry yields `T::default()`.
    fn module_config<T>(&self, module_name: &str) -> Result<T, ConfigError>
    where
        T: DeserializeOwned + Default,
    {
        match self.get_module_config(module_name) {
            None | Some(serde_json::Value::Null) => Ok(T::default()),
            Some(raw) => serde_json::from_value(raw.clone()).map_err(|source| {
                ConfigError::InvalidModuleConfig {
                    module: module_name.to_string(),
                    source,
                }
            }),
        }
    }
}

impl<P: ConfigProvider + ?Sized> ConfigProviderExt for P {}

/// [`ConfigProvider`] over a loaded [`AppConfig`].
#[derive(Clone)]
pub struct AppConfigProvider(Arc<AppConfig>);

impl AppConfigProvider {
    pub fn new(config: AppConfig) -> Self {
        Self(Arc::new(config))
    }
}

impl ConfigProvider for AppConfigProvider {
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value> {
        self.0.modules.get(module_name)
    }
}
