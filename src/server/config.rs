use serde::Deserialize;
use std::env;
use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::web::error::AppError;

#[derive(Deserialize, Debug, Clone)]
pub struct ProxyConfig {
    pub aws_region: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,

    /// Base URL of the PicoGW gateway, e.g. `http://localhost:8080`.
    pub picogw_domain: String,

    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,

    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialProxyConfig {
    aws_region: Option<String>,
    aws_access_key_id: Option<String>,
    aws_secret_access_key: Option<String>,
    picogw_domain: Option<String>,
    listen_addr: Option<String>,
    cache_ttl_secs: Option<u64>,
    cache_capacity: Option<usize>,
    upstream_timeout_secs: Option<u64>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    300
}

fn default_cache_capacity() -> usize {
    1024
}

fn default_upstream_timeout_secs() -> u64 {
    30
}

impl ProxyConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self, AppError> {
        dotenv::dotenv().ok();

        // 1. Load from file (optional)
        let file_config: PartialProxyConfig = if let Some(path_str) = config_path {
            let path = Path::new(path_str);
            if path.exists() {
                let contents = fs::read_to_string(path).map_err(|e| {
                    AppError::Config(format!("Failed to read config file at {path:?}: {e}"))
                })?;
                toml::from_str(&contents).map_err(|e| {
                    AppError::Config(format!("Failed to parse TOML from config file at {path:?}: {e}"))
                })?
            } else {
                PartialProxyConfig::default()
            }
        } else {
            PartialProxyConfig::default()
        };

        // 2. Load from environment variables; environment overrides file.
        let env_config = PartialProxyConfig::from_env()?;
        merge(env_config, file_config)
    }
}

impl PartialProxyConfig {
    fn from_env() -> Result<Self, AppError> {
        Ok(PartialProxyConfig {
            aws_region: env::var("AWS_REGION").ok(),
            aws_access_key_id: env::var("AWS_ACCESS_KEY_ID").ok(),
            aws_secret_access_key: env::var("AWS_SECRET_ACCESS_KEY").ok(),
            picogw_domain: env::var("PICOGW_DOMAIN").ok(),
            listen_addr: env::var("LISTEN_ADDR").ok(),
            cache_ttl_secs: parse_env("CACHE_TTL_SECS")?,
            cache_capacity: parse_env("CACHE_CAPACITY")?,
            upstream_timeout_secs: parse_env("UPSTREAM_TIMEOUT_SECS")?,
        })
    }
}

fn parse_env<T: FromStr>(key: &str) -> Result<Option<T>, AppError>
where
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e| AppError::Config(format!("{key} is invalid: {e}"))),
        Err(_) => Ok(None),
    }
}

fn merge(env: PartialProxyConfig, file: PartialProxyConfig) -> Result<ProxyConfig, AppError> {
    Ok(ProxyConfig {
        aws_region: env
            .aws_region
            .or(file.aws_region)
            .ok_or_else(|| AppError::Config("AWS_REGION is required".to_string()))?,
        aws_access_key_id: env
            .aws_access_key_id
            .or(file.aws_access_key_id)
            .ok_or_else(|| AppError::Config("AWS_ACCESS_KEY_ID is required".to_string()))?,
        aws_secret_access_key: env
            .aws_secret_access_key
            .or(file.aws_secret_access_key)
            .ok_or_else(|| AppError::Config("AWS_SECRET_ACCESS_KEY is required".to_string()))?,
        picogw_domain: env
            .picogw_domain
            .or(file.picogw_domain)
            .ok_or_else(|| AppError::Config("PICOGW_DOMAIN is required".to_string()))?,
        listen_addr: env
            .listen_addr
            .or(file.listen_addr)
            .unwrap_or_else(default_listen_addr),
        cache_ttl_secs: env
            .cache_ttl_secs
            .or(file.cache_ttl_secs)
            .unwrap_or_else(default_cache_ttl_secs),
        cache_capacity: env
            .cache_capacity
            .or(file.cache_capacity)
            .unwrap_or_else(default_cache_capacity),
        upstream_timeout_secs: env
            .upstream_timeout_secs
            .or(file.upstream_timeout_secs)
            .unwrap_or_else(default_upstream_timeout_secs),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required_fields() -> PartialProxyConfig {
        PartialProxyConfig {
            aws_region: Some("ap-northeast-1".to_string()),
            aws_access_key_id: Some("AKIDEXAMPLE".to_string()),
            aws_secret_access_key: Some("secret".to_string()),
            picogw_domain: Some("http://localhost:8080".to_string()),
            ..PartialProxyConfig::default()
        }
    }

    #[test]
    fn test_merge_applies_defaults() {
        let config = merge(PartialProxyConfig::default(), required_fields()).unwrap();

        assert_eq!(config.aws_region, "ap-northeast-1");
        assert_eq!(config.listen_addr, "0.0.0.0:8000");
        assert_eq!(config.cache_ttl_secs, 300);
        assert_eq!(config.cache_capacity, 1024);
        assert_eq!(config.upstream_timeout_secs, 30);
    }

    #[test]
    fn test_merge_env_overrides_file() {
        let env = PartialProxyConfig {
            aws_region: Some("us-east-1".to_string()),
            listen_addr: Some("127.0.0.1:9000".to_string()),
            ..PartialProxyConfig::default()
        };

        let config = merge(env, required_fields()).unwrap();

        assert_eq!(config.aws_region, "us-east-1");
        assert_eq!(config.listen_addr, "127.0.0.1:9000");
        // Fields missing from the environment fall back to the file.
        assert_eq!(config.aws_access_key_id, "AKIDEXAMPLE");
    }

    #[test]
    fn test_merge_missing_required_field() {
        let mut file = required_fields();
        file.picogw_domain = None;

        let err = merge(PartialProxyConfig::default(), file).unwrap_err();
        assert!(err.to_string().contains("PICOGW_DOMAIN"));
    }

    #[test]
    fn test_partial_config_from_toml() {
        let partial: PartialProxyConfig = toml::from_str(
            r#"
            aws_region = "ap-northeast-1"
            cache_ttl_secs = 60
            "#,
        )
        .unwrap();

        assert_eq!(partial.aws_region.as_deref(), Some("ap-northeast-1"));
        assert_eq!(partial.cache_ttl_secs, Some(60));
        assert!(partial.aws_access_key_id.is_none());
    }
}
