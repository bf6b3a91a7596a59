use anyhow::Result;
use clap::Parser;
use dotenvy::dotenv;
use serde::Deserialize;

/// Command-line overrides for the environment configuration.
#[derive(Debug, Parser)]
#[command(name = "factura", about = "Terminal client for the facturación backend")]
pub struct Cli {
    /// Backend base URL, e.g. http://localhost:8080/api
    #[arg(long)]
    pub api_url: Option<String>,

    /// Rows requested per page from list endpoints
    #[arg(long)]
    pub page_size: Option<usize>,
}

/// Configuration for the application
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Base URL of the invoicing backend
    pub api_base_url: String,

    /// Rows per page for list endpoints
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    20
}

impl Config {
    /// Load configuration from environment variables (POS_API_BASE_URL,
    /// POS_PAGE_SIZE), reading a .env file first if one exists.
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let config = envy::prefixed("POS_").from_env::<Config>()?;

        Ok(config)
    }

    pub fn api_base_url(&self) -> &str {
        &self.api_base_url
    }

    /// Command-line flags win over environment values.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(url) = &cli.api_url {
            self.api_base_url = url.clone();
        }
        if let Some(size) = cli.page_size {
            self.page_size = size;
        }
    }
}

/// Load configuration and apply command-line overrides on top.
pub fn init(cli: &Cli) -> Result<Config> {
    let mut config = Config::load()?;
    config.apply_cli(cli);

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_take_precedence() {
        let mut config = Config {
            api_base_url: "http://env:8080".to_string(),
            page_size: 20,
        };

        config.apply_cli(&Cli {
            api_url: Some("http://cli:9090".to_string()),
            page_size: Some(50),
        });

        assert_eq!(config.api_base_url, "http://cli:9090");
        assert_eq!(config.page_size, 50);
    }

    #[test]
    fn absent_flags_keep_environment_values() {
        let mut config = Config {
            api_base_url: "http://env:8080".to_string(),
            page_size: 20,
        };

        config.apply_cli(&Cli {
            api_url: None,
            page_size: None,
        });

        assert_eq!(config.api_base_url, "http://env:8080");
        assert_eq!(config.page_size, 20);
    }
}
