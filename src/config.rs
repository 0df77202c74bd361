use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub workflow: WorkflowConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: Option<u32>,
    pub min_connections: Option<u32>,
}

/// Identity headers written by the upstream auth gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowConfig {
    pub actor_id_header: String,
    pub actor_role_header: String,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            actor_id_header: "x-actor-id".to_string(),
            actor_role_header: "x-actor-role".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub name: String,
    pub environment: Environment,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let host = env::var("SERVER_HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string())
            .parse::<IpAddr>()
            .context("Failed to parse SERVER_HOST")?;

        let port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()
            .context("Failed to parse SERVER_PORT")?;

        let db_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let db_max_connections = match env::var("DATABASE_MAX_CONNECTIONS") {
            Ok(val) => Some(val.parse().context("Failed to parse DATABASE_MAX_CONNECTIONS")?),
            Err(_) => Some(10),
        };
        let db_min_connections = match env::var("DATABASE_MIN_CONNECTIONS") {
            Ok(val) => Some(val.parse().context("Failed to parse DATABASE_MIN_CONNECTIONS")?),
            Err(_) => Some(1),
        };

        let defaults = WorkflowConfig::default();
        let actor_id_header = header_name("WORKFLOW_ACTOR_ID_HEADER", defaults.actor_id_header)?;
        let actor_role_header =
            header_name("WORKFLOW_ACTOR_ROLE_HEADER", defaults.actor_role_header)?;

        let environment = env::var("APP_ENVIRONMENT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();
        let app_name = env::var("APP_NAME").unwrap_or_else(|_| "Complaint Workflow".to_string());

        Ok(Config {
            server: ServerConfig { host, port },
            database: DatabaseConfig {
                url: db_url,
                max_connections: db_max_connections,
                min_connections: db_min_connections,
            },
            workflow: WorkflowConfig {
                actor_id_header,
                actor_role_header,
            },
            app: AppConfig {
                name: app_name,
                environment,
            },
        })
    }

    pub fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.host, self.server.port)
    }
}

/// Header names are matched case-insensitively, so they are stored lowercase.
fn header_name(var: &str, default: String) -> Result<String> {
    let name = env::var(var).unwrap_or(default).trim().to_ascii_lowercase();
    anyhow::ensure!(!name.is_empty(), "{} must not be empty", var);
    axum::http::HeaderName::from_str(&name)
        .with_context(|| format!("{} is not a valid header name", var))?;
    Ok(name)
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "production" => Ok(Environment::Production),
            "staging" => Ok(Environment::Staging),
            "development" => Ok(Environment::Development),
            _ => Err(format!("Unknown environment: {}", s)),
        }
    }
}

static CONFIG: OnceCell<Config> = OnceCell::new();

pub fn init() -> Result<&'static Config> {
    CONFIG.get_or_try_init(Config::from_env)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parses_case_insensitively() {
        assert_eq!("Production".parse::<Environment>(), Ok(Environment::Production));
        assert_eq!(" staging ".parse::<Environment>(), Ok(Environment::Staging));
        assert!("qa".parse::<Environment>().is_err());
        assert_eq!(Environment::default(), Environment::Development);
    }

    #[test]
    fn default_identity_headers_are_lowercase() {
        let defaults = WorkflowConfig::default();
        assert_eq!(defaults.actor_id_header, "x-actor-id");
        assert_eq!(defaults.actor_role_header, "x-actor-role");
    }
}
