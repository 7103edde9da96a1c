//! Server configuration, read from flags or the environment.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_API_KEY: &str = "cattle-keeper-secret-key-change-in-production";
pub const DEFAULT_MAX_FILE_SIZE: usize = 5 * 1024 * 1024;

#[derive(Debug, Clone, Parser)]
#[command(name = "cattle-keeper", version, about = "Self-hosted cattle, milk and activity record server")]
pub struct Config {
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Shared secret expected in the `X-API-Key` header.
    #[arg(long, env = "API_KEY", default_value = DEFAULT_API_KEY, hide_env_values = true)]
    pub api_key: String,

    #[arg(long, env = "DATABASE_PATH", default_value = "./data/database.sqlite")]
    pub database_path: PathBuf,

    #[arg(long, env = "UPLOAD_DIR", default_value = "./uploads")]
    pub upload_dir: PathBuf,

    /// Upload limit in bytes.
    #[arg(long, env = "MAX_FILE_SIZE", default_value_t = DEFAULT_MAX_FILE_SIZE)]
    pub max_file_size: usize,

    #[arg(long, env = "CORS_ORIGIN", default_value = "*")]
    pub cors_origin: String,

    /// Base for image URLs. Falls back to the request `Host` header.
    #[arg(long, env = "PUBLIC_URL")]
    pub public_url: Option<String>,

    #[arg(long = "env", env = "APP_ENV", default_value = "development")]
    pub app_env: String,
}

impl Config {
    pub fn is_development(&self) -> bool {
        self.app_env.eq_ignore_ascii_case("development")
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }

    /// Configuration rooted in `dir`, for tests and embedding.
    pub fn local(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            port: 0,
            host: "127.0.0.1".to_string(),
            api_key: DEFAULT_API_KEY.to_string(),
            database_path: dir.join("database.sqlite"),
            upload_dir: dir.join("uploads"),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            cors_origin: "*".to_string(),
            public_url: None,
            app_env: "development".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_defaults() {
        let config = Config::try_parse_from([
            "cattle-keeper",
            "--port",
            "8081",
            "--api-key",
            "s3cret",
            "--env",
            "production",
        ])
        .unwrap();
        assert_eq!(config.port, 8081);
        assert_eq!(config.api_key, "s3cret");
        assert!(!config.is_development());
    }

    #[test]
    fn test_local_config() {
        let config = Config::local("/tmp/herd");
        assert_eq!(config.upload_dir, PathBuf::from("/tmp/herd/uploads"));
        assert_eq!(config.max_file_size, 5 * 1024 * 1024);
        assert_eq!(config.bind_addr().unwrap().port(), 0);
    }
}
