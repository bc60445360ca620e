use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{LokimapError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub http_addr: String,
    pub api_prefix: String,
    pub loki_url: String,
    pub bot_service: String,
    pub batch_size: usize,
    pub default_window_hours: u32,
    pub request_timeout: Duration,
    pub catalog_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_addr: "127.0.0.1:8084".to_string(),
            api_prefix: "/api/dashboard".to_string(),
            loki_url: "http://127.0.0.1:3100".to_string(),
            bot_service: "loom-tg-bot".to_string(),
            batch_size: 5000,
            default_window_hours: 24,
            request_timeout: Duration::from_secs(30),
            catalog_path: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut cfg = Self::default();
        let config_path = config_file_path();
        if let Some(file_overrides) = load_file_overrides(&config_path)? {
            apply_overrides(&mut cfg, file_overrides, "config file")?;
        }
        let env_overrides = load_env_overrides()?;
        apply_overrides(&mut cfg, env_overrides, "environment")?;
        Ok(cfg)
    }

    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        let env_overrides = load_env_overrides()?;
        apply_overrides(&mut cfg, env_overrides, "environment")?;
        Ok(cfg)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigOverrides {
    http_addr: Option<String>,
    api_prefix: Option<String>,
    loki_url: Option<String>,
    bot_service: Option<String>,
    batch_size: Option<usize>,
    default_window_hours: Option<u32>,
    request_timeout: Option<String>,
    catalog_path: Option<PathBuf>,
}

fn config_file_path() -> PathBuf {
    if let Ok(path) = env::var("LOKIMAP_CONFIG") {
        return PathBuf::from(path);
    }

    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let config_home = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(home).join(".config"));
    config_home.join("lokimap/config.toml")
}

fn load_file_overrides(path: &PathBuf) -> Result<Option<ConfigOverrides>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| LokimapError::Config(format!("failed reading {}: {e}", path.display())))?;
    let parsed: ConfigOverrides = toml::from_str(&raw)
        .map_err(|e| LokimapError::Config(format!("failed parsing {}: {e}", path.display())))?;
    Ok(Some(parsed))
}

fn load_env_overrides() -> Result<ConfigOverrides> {
    let batch_size = match env::var("LOKIMAP_BATCH_SIZE") {
        Ok(v) => Some(v.parse::<usize>().map_err(|e| {
            LokimapError::Config(format!("bad LOKIMAP_BATCH_SIZE in environment: {e}"))
        })?),
        Err(_) => None,
    };
    let default_window_hours = match env::var("LOKIMAP_DEFAULT_WINDOW_HOURS") {
        Ok(v) => Some(v.parse::<u32>().map_err(|e| {
            LokimapError::Config(format!("bad LOKIMAP_DEFAULT_WINDOW_HOURS in environment: {e}"))
        })?),
        Err(_) => None,
    };

    Ok(ConfigOverrides {
        http_addr: env::var("LOKIMAP_HTTP_ADDR").ok(),
        api_prefix: env::var("LOKIMAP_API_PREFIX").ok(),
        loki_url: env::var("LOKIMAP_LOKI_URL").ok(),
        bot_service: env::var("LOKIMAP_BOT_SERVICE").ok(),
        batch_size,
        default_window_hours,
        request_timeout: env::var("LOKIMAP_REQUEST_TIMEOUT").ok(),
        catalog_path: env::var("LOKIMAP_CATALOG_PATH").ok().map(PathBuf::from),
    })
}

fn apply_overrides(cfg: &mut Config, overrides: ConfigOverrides, source: &str) -> Result<()> {
    if let Some(v) = overrides.http_addr {
        cfg.http_addr = v;
    }
    if let Some(v) = overrides.api_prefix {
        cfg.api_prefix = v;
    }
    if let Some(v) = overrides.loki_url {
        cfg.loki_url = v.trim_end_matches('/').to_string();
    }
    if let Some(v) = overrides.bot_service {
        cfg.bot_service = v;
    }
    if let Some(v) = overrides.batch_size {
        if v == 0 {
            return Err(LokimapError::Config(format!(
                "batch_size in {source} must be positive"
            )));
        }
        cfg.batch_size = v;
    }
    if let Some(v) = overrides.default_window_hours {
        cfg.default_window_hours = v;
    }
    if let Some(v) = overrides.request_timeout {
        cfg.request_timeout = crate::time::parse_duration_str(&v)
            .map_err(|e| LokimapError::Config(format!("bad request_timeout in {source}: {e}")))?;
    }
    if let Some(v) = overrides.catalog_path {
        cfg.catalog_path = Some(v);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn default_points_at_local_loki() {
        let cfg = Config::default();
        assert_eq!(cfg.loki_url, "http://127.0.0.1:3100");
        assert_eq!(cfg.bot_service, "loom-tg-bot");
        assert_eq!(cfg.batch_size, 5000);
    }

    #[test]
    fn file_overrides_apply() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "loki_url = \"http://loki:3100/\"\nbatch_size = 100\nrequest_timeout = \"5s\""
        )
        .unwrap();

        let overrides = load_file_overrides(&file.path().to_path_buf())
            .unwrap()
            .unwrap();
        let mut cfg = Config::default();
        apply_overrides(&mut cfg, overrides, "config file").unwrap();

        assert_eq!(cfg.loki_url, "http://loki:3100");
        assert_eq!(cfg.batch_size, 100);
        assert_eq!(cfg.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn zero_batch_size_rejected() {
        let overrides = ConfigOverrides {
            batch_size: Some(0),
            ..ConfigOverrides::default()
        };
        let mut cfg = Config::default();
        assert!(apply_overrides(&mut cfg, overrides, "config file").is_err());
    }

    #[test]
    fn bad_timeout_rejected() {
        let overrides = ConfigOverrides {
            request_timeout: Some("soon".to_string()),
            ..ConfigOverrides::default()
        };
        let mut cfg = Config::default();
        assert!(apply_overrides(&mut cfg, overrides, "environment").is_err());
    }
}
