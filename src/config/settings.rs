use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub grpc: GrpcConfig,
    pub jwt: JwtConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub smtp: SmtpConfig,
    #[serde(default)]
    pub template: TemplateConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GrpcConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_grpc_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Storage backend: "postgres" or "memory"
    #[serde(default = "default_database_backend")]
    pub backend: String,
    #[serde(default)]
    pub url: String,
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    /// Mail backend: "smtp" or "noop"
    #[serde(default = "default_smtp_backend")]
    pub backend: String,
    #[serde(default = "default_smtp_host")]
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default = "default_from_address")]
    pub from_address: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateConfig {
    #[serde(default = "default_template_dir")]
    pub dir: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_grpc_port() -> u16 {
    50051
}

fn default_database_backend() -> String {
    "memory".to_string()
}

fn default_pool_size() -> u32 {
    5
}

fn default_connect_timeout() -> u32 {
    5
}

fn default_smtp_backend() -> String {
    "noop".to_string()
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    1025
}

fn default_from_address() -> String {
    "\"Pictoria App\" <pictoria@org.id>".to_string()
}

fn default_template_dir() -> String {
    "templates".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("grpc.host", "0.0.0.0")?
            .set_default("grpc.port", 50051)?
            .set_default("database.backend", "memory")?
            .set_default("smtp.backend", "noop")?
            .set_default("template.dir", "templates")?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables
            // SERVER_HOST, SERVER_PORT, JWT_SECRET, DATABASE_URL, SMTP_HOST, etc.
            .add_source(
                Environment::default()
                    .separator("_")
                    .try_parsing(true)
                    .list_separator(","),
            );

        builder.build()?.try_deserialize()
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn grpc_addr(&self) -> String {
        format!("{}:{}", self.grpc.host, self.grpc.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for GrpcConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_grpc_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: default_database_backend(),
            url: String::new(),
            pool_size: default_pool_size(),
            connect_timeout_seconds: default_connect_timeout(),
        }
    }
}

impl Default for SmtpConfig {
    fn default() -> Self {
        Self {
            backend: default_smtp_backend(),
            host: default_smtp_host(),
            port: default_smtp_port(),
            from_address: default_from_address(),
        }
    }
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            dir: default_template_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let server = ServerConfig::default();
        assert_eq!(server.host, "0.0.0.0");
        assert_eq!(server.port, 3000);

        let grpc = GrpcConfig::default();
        assert_eq!(grpc.port, 50051);

        let smtp = SmtpConfig::default();
        assert_eq!(smtp.backend, "noop");
        assert_eq!(smtp.port, 1025);
    }

    #[test]
    fn test_addr_formatting() {
        let settings = Settings {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            grpc: GrpcConfig {
                host: "127.0.0.1".to_string(),
                port: 50051,
            },
            jwt: JwtConfig {
                secret: "secret".to_string(),
                issuer: None,
                audience: None,
            },
            database: DatabaseConfig::default(),
            smtp: SmtpConfig::default(),
            template: TemplateConfig::default(),
        };

        assert_eq!(settings.server_addr(), "127.0.0.1:3000");
        assert_eq!(settings.grpc_addr(), "127.0.0.1:50051");
    }
}
