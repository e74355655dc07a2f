use std::env;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(anyhow::anyhow!("Unknown store backend: {s}")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store_backend: StoreBackend,
    /// Required when `store_backend` is Postgres.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expiry_seconds: u64,
    pub bcrypt_cost: u32,
    pub invitation_expiry_hours: i64,
    pub host: String,
    pub port: u16,
    pub app_base_url: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let store_backend: StoreBackend = env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".into())
            .parse()?;
        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());
        if store_backend == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("Missing required env var: DATABASE_URL");
        }

        Ok(Self {
            store_backend,
            database_url,
            jwt_secret: required("JWT_SECRET")?,
            jwt_expiry_seconds: env::var("JWT_EXPIRY_SECONDS")
                .unwrap_or_else(|_| "86400".into())
                .parse()?,
            bcrypt_cost: bcrypt_cost()?,
            invitation_expiry_hours: env::var("INVITATION_EXPIRY_HOURS")
                .unwrap_or_else(|_| "168".into())
                .parse()?,
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".into())
                .parse()?,
            app_base_url: env::var("APP_BASE_URL")
                .unwrap_or_else(|_| "http://localhost".into()),
        })
    }
}

/// `BCRYPT_COST`, default 10. Shared with the seed tool.
pub fn bcrypt_cost() -> anyhow::Result<u32> {
    parse_bcrypt_cost(env::var("BCRYPT_COST").ok())
}

fn parse_bcrypt_cost(value: Option<String>) -> anyhow::Result<u32> {
    let cost: u32 = value.as_deref().unwrap_or("10").parse()?;
    anyhow::ensure!((4..=31).contains(&cost), "BCRYPT_COST must be between 4 and 31");
    Ok(cost)
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).map_err(|_| anyhow::anyhow!("Missing required env var: {}", key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_store_backend() {
        assert_eq!("memory".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert_eq!("Postgres".parse::<StoreBackend>().unwrap(), StoreBackend::Postgres);
        assert!("mongo".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn bcrypt_cost_defaults_and_bounds() {
        assert_eq!(parse_bcrypt_cost(None).unwrap(), 10);
        assert_eq!(parse_bcrypt_cost(Some("12".into())).unwrap(), 12);
        assert!(parse_bcrypt_cost(Some("2".into())).is_err());
        assert!(parse_bcrypt_cost(Some("fast".into())).is_err());
    }
}
