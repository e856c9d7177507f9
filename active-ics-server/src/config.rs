use std::{env, time::Duration};

use active_ics_core::ics::resolve_tzid;
use anyhow::{Result, anyhow};
use chrono_tz::Tz;

/// 服务配置，全部来自环境变量
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PORT`，默认 3000
    pub port: u16,
    /// `REDIS_URL`，未设置时使用进程内缓存
    pub redis_url: Option<String>,
    /// `CALENDAR_CACHE_TTL_SECS`，默认 300
    pub cache_ttl: Duration,
    /// `DEFAULT_TIMEZONE`，日历未声明时区时使用，默认 UTC
    pub default_timezone: Tz,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let port = match var("PORT") {
            Some(port) => port
                .parse::<u16>()
                .map_err(|_| anyhow!("PORT must be a port number, got '{}'", port))?,
            None => 3000,
        };

        let cache_ttl = match var("CALENDAR_CACHE_TTL_SECS") {
            Some(secs) => Duration::from_secs(secs.parse::<u64>().map_err(|_| {
                anyhow!("CALENDAR_CACHE_TTL_SECS must be a number of seconds, got '{}'", secs)
            })?),
            None => Duration::from_secs(300),
        };

        let default_timezone = match var("DEFAULT_TIMEZONE") {
            Some(name) => {
                resolve_tzid(&name).ok_or_else(|| anyhow!("unknown DEFAULT_TIMEZONE '{}'", name))?
            }
            None => Tz::UTC,
        };

        Ok(Self {
            port,
            redis_url: var("REDIS_URL"),
            cache_ttl,
            default_timezone,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<ServerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.redis_url, None);
        assert_eq!(config.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.default_timezone, Tz::UTC);
    }

    #[test]
    fn reads_overrides() {
        let config = config(&[
            ("PORT", "8080"),
            ("REDIS_URL", "redis://localhost:6379"),
            ("CALENDAR_CACHE_TTL_SECS", "60"),
            ("DEFAULT_TIMEZONE", "Europe/London"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.redis_url.as_deref(), Some("redis://localhost:6379"));
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.default_timezone, chrono_tz::Europe::London);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(config(&[("PORT", "eighty")]).is_err());
        assert!(config(&[("CALENDAR_CACHE_TTL_SECS", "-1")]).is_err());
        assert!(config(&[("DEFAULT_TIMEZONE", "Mars/Olympus")]).is_err());
    }
}
