use anyhow::{anyhow, Context, Result};
use common_auth::config::{DEFAULT_ACCESS_TTL_MINUTES, DEFAULT_REFRESH_TTL_DAYS};
use common_auth::{parse_algorithm, TokenConfig};
use std::env;
use std::net::{IpAddr, SocketAddr};

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8085;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub seed_demo_users: bool,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }
}

pub fn load_token_config() -> Result<TokenConfig> {
    token_config_from(|key| env::var(key).ok())
}

pub fn load_server_config() -> Result<ServerConfig> {
    server_config_from(|key| env::var(key).ok())
}

pub(crate) fn token_config_from<F>(lookup: F) -> Result<TokenConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let secret = lookup("SECRET_KEY")
        .and_then(|value| normalize_optional(&value))
        .ok_or_else(|| anyhow!("SECRET_KEY must be set"))?;

    let algorithm = match lookup("ALGORITHM").and_then(|value| normalize_optional(&value)) {
        Some(value) => parse_algorithm(&value).context("Failed to parse ALGORITHM")?,
        None => common_auth::Algorithm::HS256,
    };

    let access_minutes = int_from(&lookup, "ACCESS_TOKEN_EXPIRE_MINUTES")?
        .unwrap_or(DEFAULT_ACCESS_TTL_MINUTES);
    let refresh_days =
        int_from(&lookup, "REFRESH_TOKEN_EXPIRE_DAYS")?.unwrap_or(DEFAULT_REFRESH_TTL_DAYS);

    let config = TokenConfig::new(secret)
        .with_algorithm(algorithm)
        .with_access_ttl_minutes(access_minutes)
        .context("Invalid ACCESS_TOKEN_EXPIRE_MINUTES")?
        .with_refresh_ttl_days(refresh_days)
        .context("Invalid REFRESH_TOKEN_EXPIRE_DAYS")?;
    config.validate().context("Invalid token configuration")?;
    Ok(config)
}

pub(crate) fn server_config_from<F>(lookup: F) -> Result<ServerConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let host = lookup("HOST")
        .and_then(|value| normalize_optional(&value))
        .unwrap_or_else(|| DEFAULT_HOST.to_string());
    let host: IpAddr = host
        .parse()
        .with_context(|| format!("Invalid HOST '{host}'"))?;

    let port = match lookup("PORT").and_then(|value| normalize_optional(&value)) {
        Some(value) => value
            .parse::<u16>()
            .with_context(|| format!("Invalid PORT '{value}'"))?,
        None => DEFAULT_PORT,
    };

    let seed_demo_users = lookup("AUTH_SEED_DEMO_USERS")
        .map(|value| is_truthy(&value))
        .unwrap_or(false);

    Ok(ServerConfig {
        host,
        port,
        seed_demo_users,
    })
}

fn int_from<F>(lookup: &F, key: &str) -> Result<Option<i64>>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|value| normalize_optional(&value))
        .map(|value| {
            value
                .parse::<i64>()
                .with_context(|| format!("Failed to parse {key}='{value}' as an integer"))
        })
        .transpose()
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn normalize_optional(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use common_auth::Algorithm;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn token_config_reads_all_keys() {
        let config = token_config_from(lookup(&[
            ("SECRET_KEY", "s3cret"),
            ("ALGORITHM", "HS384"),
            ("ACCESS_TOKEN_EXPIRE_MINUTES", "5"),
            ("REFRESH_TOKEN_EXPIRE_DAYS", "1"),
        ]))
        .expect("config");

        assert_eq!(config.secret, "s3cret");
        assert_eq!(config.algorithm, Algorithm::HS384);
        assert_eq!(config.access_ttl, Duration::minutes(5));
        assert_eq!(config.refresh_ttl, Duration::days(1));
    }

    #[test]
    fn token_config_applies_defaults() {
        let config = token_config_from(lookup(&[("SECRET_KEY", "s3cret")])).expect("config");
        assert_eq!(config.algorithm, Algorithm::HS256);
        assert_eq!(config.access_ttl, Duration::minutes(30));
        assert_eq!(config.refresh_ttl, Duration::days(7));
    }

    #[test]
    fn token_config_requires_secret() {
        let err = token_config_from(lookup(&[("SECRET_KEY", "  ")])).expect_err("missing secret");
        assert!(err.to_string().contains("SECRET_KEY"));
    }

    #[test]
    fn token_config_rejects_bad_values() {
        assert!(token_config_from(lookup(&[
            ("SECRET_KEY", "s3cret"),
            ("ALGORITHM", "RS256"),
        ]))
        .is_err());
        assert!(token_config_from(lookup(&[
            ("SECRET_KEY", "s3cret"),
            ("ACCESS_TOKEN_EXPIRE_MINUTES", "soon"),
        ]))
        .is_err());
        assert!(token_config_from(lookup(&[
            ("SECRET_KEY", "s3cret"),
            ("REFRESH_TOKEN_EXPIRE_DAYS", "0"),
        ]))
        .is_err());
    }

    #[test]
    fn token_config_rejects_oversized_lifetimes() {
        let err = token_config_from(lookup(&[
            ("SECRET_KEY", "s3cret"),
            ("ACCESS_TOKEN_EXPIRE_MINUTES", "9223372036854775807"),
        ]))
        .expect_err("minutes overflow");
        assert!(err.to_string().contains("ACCESS_TOKEN_EXPIRE_MINUTES"));

        let err = token_config_from(lookup(&[
            ("SECRET_KEY", "s3cret"),
            ("REFRESH_TOKEN_EXPIRE_DAYS", "100000000"),
        ]))
        .expect_err("expiry past representable range");
        assert!(err.to_string().contains("Invalid token configuration"));
    }

    #[test]
    fn server_config_parses_and_defaults() {
        let config = server_config_from(lookup(&[])).expect("defaults");
        assert_eq!(config.port, 8085);
        assert!(!config.seed_demo_users);

        let config = server_config_from(lookup(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "9000"),
            ("AUTH_SEED_DEMO_USERS", "yes"),
        ]))
        .expect("explicit");
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:9000");
        assert!(config.seed_demo_users);

        assert!(server_config_from(lookup(&[("PORT", "http")])).is_err());
    }

    #[test]
    fn is_truthy_parses() {
        assert!(is_truthy("true"));
        assert!(is_truthy(" ON "));
        assert!(is_truthy("1"));
        assert!(!is_truthy("no"));
    }
}
