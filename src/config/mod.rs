mod settings;

pub use settings::{
    DatabaseConfig, GrpcConfig, JwtConfig, ServerConfig, Settings, SmtpConfig, TemplateConfig,
};
