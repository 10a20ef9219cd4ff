pub mod config;

pub use config::{
    AppConfig, ConfigError, ConfigOverrides, GeminiConfig, LoadOptions, LogFormat, LoggingConfig,
    ServerConfig,
};
