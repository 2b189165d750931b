use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::paths::resolve_home_dir;

/// Environment prefix for configuration overrides.
/// `JRPC__SERVER__PORT=9000` maps to `server.port`.
pub const ENV_PREFIX: &str = "JRPC__";

const DEFAULT_HOME_SUBDIR: &str = ".jrpc";

/// Application configuration: typed global sections plus a per-module bag.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    /// Logging configuration (optional, uses defaults if None).
    pub logging: Option<LoggingConfig>,
    /// Directory with per-module YAML files, one file per module (optional).
    #[serde(default)]
    pub modules_dir: Option<String>,
    /// module_name → arbitrary JSON/YAML value.
    #[serde(default)]
    pub modules: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Normalized to an absolute path on load.
    pub home_dir: String,
    pub host: String,
    pub port: u16,
}

/// Subsystem name → logging section. `"default"` catches everything that
/// has no explicit section.
pub type LoggingConfig = HashMap<String, Section>;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Section {
    /// "trace" | "debug" | "info" | "warn" | "error" | "off"
    pub console_level: String,
    /// Log file, relative to `server.home_dir` unless absolute. Empty disables it.
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub file_level: String,
    #[serde(default)]
    pub max_age_days: Option<u32>,
    #[serde(default)]
    pub max_backups: Option<usize>,
    #[serde(default)]
    pub max_size_mb: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            // Empty means $HOME/.jrpc (or %APPDATA%/.jrpc)
            home_dir: String::new(),
            host: "127.0.0.1".to_string(),
            port: 8000,
        }
    }
}

pub fn default_logging_config() -> LoggingConfig {
    HashMap::from([(
        "default".to_string(),
        Section {
            console_level: "info".to_string(),
            file: "logs/jrpc.log".to_string(),
            file_level: "debug".to_string(),
            max_age_days: Some(7),
            max_backups: Some(3),
            max_size_mb: Some(100),
        },
    )])
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            logging: Some(default_logging_config()),
            modules_dir: None,
            modules: HashMap::new(),
        }
    }
}

impl AppConfig {
    /// Layered load: defaults → YAML file → `JRPC__*` environment.
    /// Normalizes `server.home_dir` to an absolute path and creates it.
    pub fn load_layered<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        use figment::{
            providers::{Env, Format, Serialized, Yaml},
            Figment,
        };

        // Optional sections stay None unless YAML or ENV provides them.
        let base = AppConfig {
            logging: None,
            ..AppConfig::default()
        };

        let mut config: AppConfig = Figment::new()
            .merge(Serialized::defaults(base))
            .merge(Yaml::file(config_path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| {
                format!(
                    "Failed to load config from {}",
                    config_path.as_ref().display()
                )
            })?;

        normalize_home_dir_inplace(&mut config.server)
            .context("Failed to resolve server.home_dir")?;

        if let Some(dir) = config.modules_dir.clone() {
            merge_module_files(&mut config.modules, dir)?;
        }

        Ok(config)
    }

    /// Load from `config_path` when given, otherwise use defaults.
    pub fn load_or_default<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_layered(path),
            None => {
                let mut config = Self::default();
                normalize_home_dir_inplace(&mut config.server)
                    .context("Failed to resolve server.home_dir (defaults)")?;
                Ok(config)
            }
        }
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config to YAML")
    }

    /// Apply command line overrides on top of the loaded layers.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(port) = args.port {
            self.server.port = port;
        }

        let logging = self.logging.get_or_insert_with(default_logging_config);
        if let Some(default_section) = logging.get_mut("default") {
            match args.verbose {
                0 => {}
                1 => default_section.console_level = "debug".to_string(),
                _ => default_section.console_level = "trace".to_string(),
            }
        }
    }

    pub fn home_dir(&self) -> PathBuf {
        PathBuf::from(&self.server.home_dir)
    }
}

/// Command line values that feed into [`AppConfig::apply_cli_overrides`].
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub port: Option<u16>,
    pub verbose: u8,
}

fn normalize_home_dir_inplace(server: &mut ServerConfig) -> Result<()> {
    let configured = Some(server.home_dir.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    let resolved = resolve_home_dir(configured, DEFAULT_HOME_SUBDIR, true)
        .context("home_dir normalization failed")?;

    server.home_dir = resolved.to_string_lossy().into_owned();
    Ok(())
}

/// Every `<name>.yaml` / `<name>.yml` in `dir` becomes `modules.<name>`,
/// replacing an inline entry of the same name.
fn merge_module_files(
    bag: &mut HashMap<String, serde_json::Value>,
    dir: impl AsRef<Path>,
) -> Result<()> {
    let dir = dir.as_ref();
    if !dir.exists() {
        tracing::debug!(dir = %dir.display(), "modules_dir does not exist, skipping");
        return Ok(());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read modules_dir {}", dir.display()))?
    {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let is_yaml = path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if !is_yaml {
            continue;
        }

        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let value: serde_yaml::Value = serde_yaml::from_str(&raw)
            .with_context(|| format!("Invalid YAML in {}", path.display()))?;
        bag.insert(name.to_string(), serde_json::to_value(value)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write_config(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("cfg.yaml");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn default_config_structure() {
        let config = AppConfig::default();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.home_dir, "");

        let logging = config.logging.as_ref().unwrap();
        assert_eq!(logging["default"].console_level, "info");
        assert_eq!(logging["default"].file, "logs/jrpc.log");
        assert!(config.modules.is_empty());
    }

    #[test]
    fn load_layered_reads_yaml() {
        let tmp = tempdir().unwrap();
        let home = tmp.path().join("home");
        let yaml = format!(
            r#"
server:
  home_dir: "{}"
  host: "0.0.0.0"
  port: 9090

logging:
  default:
    console_level: debug
    file: "logs/default.log"

modules:
  rpc_ingress:
    path: "/rpc"
"#,
            home.display()
        );
        let path = write_config(tmp.path(), &yaml);

        let config = AppConfig::load_layered(&path).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.home_dir(), home);
        assert!(home.is_dir());
        assert_eq!(config.logging.as_ref().unwrap()["default"].console_level, "debug");
        assert_eq!(config.modules["rpc_ingress"]["path"], "/rpc");
    }

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let tmp = tempdir().unwrap();
        let yaml = format!("server:\n  home_dir: \"{}\"\n", tmp.path().display());
        let path = write_config(tmp.path(), &yaml);

        let config = AppConfig::load_layered(&path).unwrap();
        assert_eq!(config.server.port, 8000);
        assert!(config.logging.is_none());
    }

    #[test]
    fn unknown_top_level_key_is_rejected() {
        let tmp = tempdir().unwrap();
        let yaml = format!(
            "server:\n  home_dir: \"{}\"\nsurprise: true\n",
            tmp.path().display()
        );
        let path = write_config(tmp.path(), &yaml);

        assert!(AppConfig::load_layered(&path).is_err());
    }

    #[test]
    fn cli_overrides_port_and_verbosity() {
        let mut config = AppConfig::default();
        config.apply_cli_overrides(&CliArgs {
            port: Some(1234),
            verbose: 1,
            ..CliArgs::default()
        });
        assert_eq!(config.server.port, 1234);
        assert_eq!(config.logging.as_ref().unwrap()["default"].console_level, "debug");

        config.apply_cli_overrides(&CliArgs {
            verbose: 3,
            ..CliArgs::default()
        });
        assert_eq!(config.server.port, 1234);
        assert_eq!(config.logging.as_ref().unwrap()["default"].console_level, "trace");
    }

    #[test]
    fn verbosity_zero_keeps_configured_level() {
        let mut config = AppConfig::default();
        if let Some(logging) = config.logging.as_mut() {
            logging.get_mut("default").unwrap().console_level = "warn".into();
        }
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config.logging.as_ref().unwrap()["default"].console_level, "warn");
    }

    #[test]
    fn modules_dir_files_are_merged() {
        let tmp = tempdir().unwrap();
        let modules = tmp.path().join("modules");
        fs::create_dir_all(&modules).unwrap();
        fs::write(modules.join("rpc_ingress.yaml"), "title: Demo\n").unwrap();
        fs::write(modules.join("notes.txt"), "ignored").unwrap();

        let yaml = format!(
            "server:\n  home_dir: \"{}\"\nmodules_dir: \"{}\"\n",
            tmp.path().display(),
            modules.display()
        );
        let path = write_config(tmp.path(), &yaml);

        let config = AppConfig::load_layered(&path).unwrap();
        assert_eq!(config.modules["rpc_ingress"]["title"], "Demo");
        assert!(!config.modules.contains_key("notes"));
    }

    #[test]
    fn yaml_round_trip() {
        let config = AppConfig::default();
        let text = config.to_yaml().unwrap();
        let back: AppConfig = serde_yaml::from_str(&text).unwrap();
        assert_eq!(back.server.port, config.server.port);
        assert_eq!(back.server.host, config.server.host);
    }
}
