/// Configuration management for the API server
///
/// Configuration is read once from the environment (plus `.env` in
/// development) and passed into [`AppState`](crate::app::AppState).
///
/// # Environment Variables
///
/// - `API_HOST`: host to bind to (default: 0.0.0.0)
/// - `PORT`: port to bind to (default: 8000)
/// - `CORS_ORIGINS`: comma separated allowed origins (default: `*`)
/// - `PRODUCTION`: enables HSTS (default: false)
/// - `DATABASE_URI`: PostgreSQL server URI (required)
/// - `DATABASE_NAME`: database name (default: vidhub)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default: 10)
/// - `ACCESS_TOKEN_SECRET` / `REFRESH_TOKEN_SECRET`: signing secrets, at least
///   32 characters (required)
/// - `ACCESS_TOKEN_EXPIRY` / `REFRESH_TOKEN_EXPIRY`: lifetimes such as `15m`
///   or `7d` (defaults: 15m, 7d)
/// - `CLOUDINARY_CLOUD_NAME`, `CLOUDINARY_API_KEY`, `CLOUDINARY_API_SECRET`:
///   media host credentials (required)
/// - `UPLOAD_DIR`: staging directory for uploads (default: ./public/temp)
/// - `MAX_UPLOAD_BYTES`: request body limit (default: 10 MiB)
///
/// # Example
///
/// ```no_run
/// use vidhub_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::{env, path::PathBuf};

use vidhub_shared::{
    auth::jwt::{parse_expiry, TokenConfig},
    db::pool::connection_url,
    media::CloudinaryConfig,
};

/// Minimum length of a token signing secret
pub const MIN_SECRET_LENGTH: usize = 32;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub tokens: TokenConfig,
    pub cloudinary: CloudinaryConfig,
    pub uploads: UploadConfig,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Production mode (HSTS)
    pub production: bool,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Full connection URL (`DATABASE_URI` joined with `DATABASE_NAME`)
    pub url: String,

    pub max_connections: u32,
}

/// Multipart upload configuration
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Where incoming files are staged before they go to the media host
    pub dir: PathBuf,

    /// Request body limit in bytes
    pub max_bytes: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./public/temp"),
            max_bytes: 10 * 1024 * 1024,
        }
    }
}

fn required(name: &str) -> anyhow::Result<String> {
    env::var(name).map_err(|_| anyhow::anyhow!("{} environment variable is required", name))
}

fn secret(name: &str) -> anyhow::Result<String> {
    let value = required(name)?;
    if value.len() < MIN_SECRET_LENGTH {
        anyhow::bail!("{} must be at least {} characters long", name, MIN_SECRET_LENGTH);
    }
    Ok(value)
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing, a secret is too
    /// short, or a value does not parse.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let host = env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .unwrap_or_else(|_| "8000".to_string())
            .parse::<u16>()?;
        let cors_origins = parse_origins(&env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string()));
        let production = env::var("PRODUCTION")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        let database_uri = required("DATABASE_URI")?;
        let database_name = env::var("DATABASE_NAME").unwrap_or_else(|_| "vidhub".to_string());
        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()?;

        let access_expiry =
            parse_expiry(&env::var("ACCESS_TOKEN_EXPIRY").unwrap_or_else(|_| "15m".to_string()))?;
        let refresh_expiry =
            parse_expiry(&env::var("REFRESH_TOKEN_EXPIRY").unwrap_or_else(|_| "7d".to_string()))?;

        let uploads = UploadConfig {
            dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| UploadConfig::default().dir),
            max_bytes: match env::var("MAX_UPLOAD_BYTES") {
                Ok(value) => value.parse::<usize>()?,
                Err(_) => UploadConfig::default().max_bytes,
            },
        };

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: connection_url(&database_uri, &database_name),
                max_connections,
            },
            tokens: TokenConfig {
                access_secret: secret("ACCESS_TOKEN_SECRET")?,
                access_expiry,
                refresh_secret: secret("REFRESH_TOKEN_SECRET")?,
                refresh_expiry,
            },
            cloudinary: CloudinaryConfig {
                cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
                api_key: required("CLOUDINARY_API_KEY")?,
                api_secret: required("CLOUDINARY_API_SECRET")?,
            },
            uploads,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}
