use anyhow::{Context, Result};
use clap::Parser;
use std::env;

/// Centralized application configuration.
/// Combines environment variables and CLI arguments.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub upload_dir: String,
    pub database_url: String,
    pub media_base_url: String,
    pub media_api_key: String,
    pub media_api_secret: String,
}

/// Command-line + environment configuration.
#[derive(Parser, Debug)]
#[command(author, version, about = "Furniture catalog API")]
pub struct Args {
    /// Host to bind to (overrides CATALOG_HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind to (overrides CATALOG_PORT)
    #[arg(long)]
    pub port: Option<u16>,

    /// Directory holding locally served images (overrides CATALOG_UPLOAD_DIR)
    #[arg(long)]
    pub upload_dir: Option<String>,

    /// Database URL (overrides CATALOG_DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Media store API base URL (overrides CATALOG_MEDIA_BASE_URL)
    #[arg(long)]
    pub media_base_url: Option<String>,

    /// Media store API key (overrides CATALOG_MEDIA_API_KEY)
    #[arg(long)]
    pub media_api_key: Option<String>,

    /// Media store API secret (overrides CATALOG_MEDIA_API_SECRET)
    #[arg(long)]
    pub media_api_secret: Option<String>,

    /// Run migrations and exit
    #[arg(long)]
    pub migrate: bool,
}

impl AppConfig {
    /// Parse environment variables + CLI args into AppConfig and migrate flag.
    pub fn from_env_and_args() -> Result<(Self, bool)> {
        // Parse CLI once
        let args = Args::parse();

        // --- Environment fallback ---
        let env_host = env::var("CATALOG_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let env_port = match env::var("CATALOG_PORT") {
            Ok(value) => value
                .parse::<u16>()
                .with_context(|| format!("parsing CATALOG_PORT value `{}`", value))?,
            Err(env::VarError::NotPresent) => 3000,
            Err(err) => return Err(err).context("reading CATALOG_PORT"),
        };
        let env_upload_dir =
            env::var("CATALOG_UPLOAD_DIR").unwrap_or_else(|_| "uploads/images".into());
        let env_db = env::var("CATALOG_DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./data/furniture_catalog.db".into());
        let env_media_base = env::var("CATALOG_MEDIA_BASE_URL")
            .unwrap_or_else(|_| "https://media.example.com/v1".into());
        let env_media_key = env::var("CATALOG_MEDIA_API_KEY").unwrap_or_default();
        let env_media_secret = env::var("CATALOG_MEDIA_API_SECRET").unwrap_or_default();

        // --- Merge ---
        let cfg = Self {
            host: args.host.unwrap_or(env_host),
            port: args.port.unwrap_or(env_port),
            upload_dir: args.upload_dir.unwrap_or(env_upload_dir),
            database_url: args.database_url.unwrap_or(env_db),
            media_base_url: args.media_base_url.unwrap_or(env_media_base),
            media_api_key: args.media_api_key.unwrap_or(env_media_key),
            media_api_secret: args.media_api_secret.unwrap_or(env_media_secret),
        };

        Ok((cfg, args.migrate))
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
