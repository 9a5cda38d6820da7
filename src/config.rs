use std::{env, fmt::Display, fs::read_to_string, path::PathBuf, str::FromStr, time::Duration};

use tracing::{debug, info};

use crate::error::ConfigError;

pub struct Config {
    pub bind_addr: String,
    pub backend_url: String,
    pub ipinfo_url: String,
    pub ipinfo_token: Option<String>,
    pub cache_path: PathBuf,
    pub static_dir: String,
    pub ip_cache_ttl: Duration,
    pub animation_tick: Duration,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Ok(Self {
            bind_addr: try_load("MOODCHEF_BIND", "127.0.0.1:3000")?,
            backend_url: try_load("MOODCHEF_BACKEND_URL", "http://127.0.0.1:5000")?,
            ipinfo_url: try_load("IPINFO_URL", "https://ipinfo.io")?,
            ipinfo_token: var("IPINFO_TOKEN").or_else(|| read_secret("IPINFO_TOKEN")),
            cache_path: try_load("MOODCHEF_CACHE_PATH", ".moodchef/ip_info.json")?,
            static_dir: try_load("MOODCHEF_STATIC_DIR", "static")?,
            ip_cache_ttl: Duration::from_secs(try_load("MOODCHEF_IP_CACHE_TTL_SECS", "3600")?),
            animation_tick: Duration::from_millis(try_load("MOODCHEF_ANIMATION_TICK_MS", "10")?),
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            backend_url: "http://127.0.0.1:5000".to_string(),
            ipinfo_url: "https://ipinfo.io".to_string(),
            ipinfo_token: None,
            cache_path: PathBuf::from(".moodchef/ip_info.json"),
            static_dir: "static".to_string(),
            ip_cache_ttl: Duration::from_secs(3600),
            animation_tick: Duration::from_millis(10),
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let raw = var(key).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    parse_value(key, &raw)
}

fn parse_value<T: FromStr>(key: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            debug!("No {secret_name} secret at {path}: {e}");
        })
        .ok()
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_numbers_and_paths() {
        let ttl: u64 = parse_value("MOODCHEF_IP_CACHE_TTL_SECS", " 60 ").unwrap();
        assert_eq!(ttl, 60);

        let path: PathBuf = parse_value("MOODCHEF_CACHE_PATH", "/tmp/ip.json").unwrap();
        assert_eq!(path, PathBuf::from("/tmp/ip.json"));
    }

    #[test]
    fn rejects_invalid_numbers() {
        let err = parse_value::<u64>("MOODCHEF_ANIMATION_TICK_MS", "fast").unwrap_err();
        assert!(err.to_string().contains("MOODCHEF_ANIMATION_TICK_MS"));
        assert!(err.to_string().contains("fast"));
    }

    #[test]
    fn defaults_match_local_setup() {
        let config = Config::default();
        assert_eq!(config.bind_addr, "127.0.0.1:3000");
        assert_eq!(config.ip_cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.animation_tick, Duration::from_millis(10));
        assert!(config.ipinfo_token.is_none());
    }
}
