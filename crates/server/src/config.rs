use std::net::{IpAddr, Ipv4Addr};

/// Server configuration, read from the environment with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    pub database_url: String,
    /// When set, form routes require this bearer token.
    pub service_token: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        let host = match std::env::var("HOST") {
            Ok(raw) => raw.parse()?,
            Err(_) => IpAddr::V4(Ipv4Addr::LOCALHOST),
        };
        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse()?,
            Err(_) => 3001,
        };
        let database_url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://forms.db".to_string());
        let service_token = std::env::var("SERVICE_TOKEN").ok().filter(|t| !t.is_empty());
        Ok(Self {
            host,
            port,
            database_url,
            service_token,
        })
    }
}
