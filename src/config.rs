use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub modules: ModulesConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
    /// Prefix the core ontology and graph routes are nested under.
    #[serde(default = "default_api_prefix")]
    pub api_prefix: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
            api_prefix: default_api_prefix(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub db_path: PathBuf,
    #[serde(default = "default_migrations_dir")]
    pub migrations_dir: PathBuf,
}

/// Plugin module configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModulesConfig {
    #[serde(default = "default_modules_dir")]
    pub modules_dir: PathBuf,
    #[serde(default = "default_customers_dir")]
    pub customers_dir: PathBuf,
    /// Customer whose config.json selects the enabled modules.
    /// When unset every discovered module is loaded (development mode).
    #[serde(default)]
    pub customer_id: Option<String>,
}

impl Default for ModulesConfig {
    fn default() -> Self {
        Self {
            modules_dir: default_modules_dir(),
            customers_dir: default_customers_dir(),
            customer_id: None,
        }
    }
}

/// List endpoint paging bounds
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PaginationConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:5173".to_string(),
    ]
}

fn default_api_prefix() -> String {
    "/api/v1".to_string()
}

fn default_migrations_dir() -> PathBuf {
    PathBuf::from("migrations")
}

fn default_modules_dir() -> PathBuf {
    PathBuf::from("modules")
}

fn default_customers_dir() -> PathBuf {
    PathBuf::from("customers")
}

fn default_page_size() -> u32 {
    50
}

fn default_max_page_size() -> u32 {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// Loads environment variables from .env file (if present) before loading config.
    /// Looks for config file in this order:
    /// 1. Path specified in ONTOGRAPH_CONFIG environment variable
    /// 2. ./config.toml in current directory
    ///
    /// `CUSTOMER_ID` in the environment overrides `modules.customer_id`.
    pub fn load() -> Result<Self> {
        // Optional .env file
        let _ = dotenv::dotenv();

        let config_path = std::env::var("ONTOGRAPH_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config.toml"));

        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config = Self::from_toml_str(&config_str)?;

        if let Ok(customer_id) = std::env::var("CUSTOMER_ID") {
            if !customer_id.trim().is_empty() {
                config.modules.customer_id = Some(customer_id.trim().to_string());
            }
        }

        Ok(config)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(config_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(config_str).context("Failed to parse config.toml")?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!("server.port must be greater than 0");
        }

        let prefix = &self.server.api_prefix;
        if !prefix.starts_with('/') || prefix.len() < 2 || prefix.ends_with('/') {
            anyhow::bail!(
                "server.api_prefix must start with '/' and must not end with '/': {}",
                prefix
            );
        }

        if self.pagination.default_page_size == 0 {
            anyhow::bail!("pagination.default_page_size must be greater than 0");
        }

        if self.pagination.default_page_size > self.pagination.max_page_size {
            anyhow::bail!("pagination.default_page_size must not exceed max_page_size");
        }

        Ok(())
    }

    /// Get database path
    pub fn db_path(&self) -> &Path {
        &self.database.db_path
    }

    /// Get migrations directory
    pub fn migrations_dir(&self) -> &Path {
        &self.database.migrations_dir
    }
}
