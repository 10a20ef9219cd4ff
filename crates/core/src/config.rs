use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub gemini: GeminiConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct GeminiConfig {
    pub api_key: Option<SecretString>,
    pub model: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    pub base_url: String,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub gemini_api_key: Option<String>,
    pub gemini_model: Option<String>,
    pub gemini_max_output_tokens: Option<u32>,
    pub gemini_temperature: Option<f32>,
    pub gemini_base_url: Option<String>,
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini: GeminiConfig {
                api_key: None,
                model: "gemini-1.5-flash".to_string(),
                max_output_tokens: 512,
                temperature: 0.7,
                base_url: "https://generativelanguage.googleapis.com".to_string(),
            },
            server: ServerConfig { bind_address: "0.0.0.0".to_string(), port: 3000 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("sabio.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(gemini) = patch.gemini {
            if let Some(api_key_value) = gemini.api_key {
                self.gemini.api_key = Some(secret_value(api_key_value));
            }
            if let Some(model) = gemini.model {
                self.gemini.model = model;
            }
            if let Some(max_output_tokens) = gemini.max_output_tokens {
                self.gemini.max_output_tokens = max_output_tokens;
            }
            if let Some(temperature) = gemini.temperature {
                self.gemini.temperature = temperature;
            }
            if let Some(base_url) = gemini.base_url {
                self.gemini.base_url = base_url;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        // GEMINI_API_KEY and PORT are the names the original deployment used;
        // they stay as fallbacks behind the SABIO_-prefixed names.
        let api_key = read_env("SABIO_GEMINI_API_KEY").or_else(|| read_env("GEMINI_API_KEY"));
        if let Some(value) = api_key {
            self.gemini.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("SABIO_GEMINI_MODEL") {
            self.gemini.model = value;
        }
        if let Some(value) = read_env("SABIO_GEMINI_MAX_OUTPUT_TOKENS") {
            self.gemini.max_output_tokens = parse_u32("SABIO_GEMINI_MAX_OUTPUT_TOKENS", &value)?;
        }
        if let Some(value) = read_env("SABIO_GEMINI_TEMPERATURE") {
            self.gemini.temperature = parse_f32("SABIO_GEMINI_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("SABIO_GEMINI_BASE_URL") {
            self.gemini.base_url = value;
        }

        if let Some(value) = read_env("SABIO_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        let port = read_env("SABIO_SERVER_PORT").or_else(|| read_env("PORT"));
        if let Some(value) = port {
            self.server.port = parse_u16("SABIO_SERVER_PORT", &value)?;
        }

        let log_level = read_env("SABIO_LOGGING_LEVEL").or_else(|| read_env("SABIO_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format = read_env("SABIO_LOGGING_FORMAT").or_else(|| read_env("SABIO_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(api_key) = overrides.gemini_api_key {
            self.gemini.api_key = Some(secret_value(api_key));
        }
        if let Some(model) = overrides.gemini_model {
            self.gemini.model = model;
        }
        if let Some(max_output_tokens) = overrides.gemini_max_output_tokens {
            self.gemini.max_output_tokens = max_output_tokens;
        }
        if let Some(temperature) = overrides.gemini_temperature {
            self.gemini.temperature = temperature;
        }
        if let Some(base_url) = overrides.gemini_base_url {
            self.gemini.base_url = base_url;
        }
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.server.port = port;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_gemini(&self.gemini)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("sabio.toml"), PathBuf::from("config/sabio.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_gemini(gemini: &GeminiConfig) -> Result<(), ConfigError> {
    let missing =
        gemini.api_key.as_ref().map(|value| value.expose_secret().trim().is_empty()).unwrap_or(true);
    if missing {
        return Err(ConfigError::Validation(
            "gemini.api_key is required. Set SABIO_GEMINI_API_KEY (or GEMINI_API_KEY). Get a key from https://aistudio.google.com/apikey".to_string()
        ));
    }

    if gemini.model.trim().is_empty() {
        return Err(ConfigError::Validation("gemini.model must not be empty".to_string()));
    }

    if gemini.max_output_tokens == 0 {
        return Err(ConfigError::Validation(
            "gemini.max_output_tokens must be greater than zero".to_string(),
        ));
    }

    if !(0.0..=2.0).contains(&gemini.temperature) {
        return Err(ConfigError::Validation(
            "gemini.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    if !gemini.base_url.starts_with("http://") && !gemini.base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "gemini.base_url must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation(
            "server.bind_address must not be empty".to_string(),
        ));
    }

    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse::<f32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    gemini: Option<GeminiPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct GeminiPatch {
    api_key: Option<String>,
    model: Option<String>,
    max_output_tokens: Option<u32>,
    temperature: Option<f32>,
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::sync::{Mutex, MutexGuard, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::*;

    const ALL_VARS: &[&str] = &[
        "SABIO_GEMINI_API_KEY",
        "GEMINI_API_KEY",
        "SABIO_GEMINI_MODEL",
        "SABIO_GEMINI_MAX_OUTPUT_TOKENS",
        "SABIO_GEMINI_TEMPERATURE",
        "SABIO_GEMINI_BASE_URL",
        "SABIO_SERVER_BIND_ADDRESS",
        "SABIO_SERVER_PORT",
        "PORT",
        "SABIO_LOGGING_LEVEL",
        "SABIO_LOG_LEVEL",
        "SABIO_LOGGING_FORMAT",
        "SABIO_LOG_FORMAT",
    ];

    // Environment mutation is process-global; serialize the tests that touch it.
    fn env_guard() -> MutexGuard<'static, ()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(Mutex::default).lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn clear_env() {
        for var in ALL_VARS {
            env::remove_var(var);
        }
    }

    fn key_overrides() -> ConfigOverrides {
        ConfigOverrides { gemini_api_key: Some("test-key".to_string()), ..ConfigOverrides::default() }
    }

    #[test]
    fn defaults_match_the_hardcoded_revision() {
        let _guard = env_guard();
        clear_env();

        let config = AppConfig::load(LoadOptions {
            overrides: key_overrides(),
            ..LoadOptions::default()
        })
        .expect("load with key override should succeed");

        assert_eq!(config.gemini.model, "gemini-1.5-flash");
        assert_eq!(config.gemini.max_output_tokens, 512);
        assert_eq!(config.gemini.temperature, 0.7);
        assert_eq!(config.gemini.base_url, "https://generativelanguage.googleapis.com");
        assert_eq!(config.server.bind_address, "0.0.0.0");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn missing_api_key_is_a_validation_error() {
        let _guard = env_guard();
        clear_env();

        let error = AppConfig::load(LoadOptions::default()).expect_err("load should fail");
        let message = error.to_string();
        assert!(message.contains("gemini.api_key"), "unexpected message: {message}");
        assert!(message.contains("SABIO_GEMINI_API_KEY"), "unexpected message: {message}");
    }

    #[test]
    fn legacy_env_names_are_honored() {
        let _guard = env_guard();
        clear_env();
        env::set_var("GEMINI_API_KEY", "legacy-key");
        env::set_var("PORT", "8123");

        let config = AppConfig::load(LoadOptions::default()).expect("load should succeed");

        assert_eq!(
            config.gemini.api_key.as_ref().map(|key| key.expose_secret().to_string()),
            Some("legacy-key".to_string())
        );
        assert_eq!(config.server.port, 8123);

        clear_env();
    }

    #[test]
    fn prefixed_env_names_win_over_legacy_names() {
        let _guard = env_guard();
        clear_env();
        env::set_var("GEMINI_API_KEY", "legacy-key");
        env::set_var("SABIO_GEMINI_API_KEY", "prefixed-key");

        let config = AppConfig::load(LoadOptions::default()).expect("load should succeed");

        assert_eq!(
            config.gemini.api_key.as_ref().map(|key| key.expose_secret().to_string()),
            Some("prefixed-key".to_string())
        );

        clear_env();
    }

    #[test]
    fn env_overrides_generation_knobs() {
        let _guard = env_guard();
        clear_env();
        env::set_var("SABIO_GEMINI_API_KEY", "test-key");
        env::set_var("SABIO_GEMINI_MODEL", "gemini-1.5-pro");
        env::set_var("SABIO_GEMINI_MAX_OUTPUT_TOKENS", "1024");
        env::set_var("SABIO_GEMINI_TEMPERATURE", "0.2");

        let config = AppConfig::load(LoadOptions::default()).expect("load should succeed");

        assert_eq!(config.gemini.model, "gemini-1.5-pro");
        assert_eq!(config.gemini.max_output_tokens, 1024);
        assert_eq!(config.gemini.temperature, 0.2);

        clear_env();
    }

    #[test]
    fn malformed_numeric_env_value_is_rejected() {
        let _guard = env_guard();
        clear_env();
        env::set_var("SABIO_GEMINI_API_KEY", "test-key");
        env::set_var("SABIO_GEMINI_MAX_OUTPUT_TOKENS", "lots");

        let error = AppConfig::load(LoadOptions::default()).expect_err("load should fail");
        assert!(matches!(
            error,
            ConfigError::InvalidEnvOverride { ref key, .. } if key == "SABIO_GEMINI_MAX_OUTPUT_TOKENS"
        ));

        clear_env();
    }

    #[test]
    fn temperature_outside_range_fails_validation() {
        let _guard = env_guard();
        clear_env();

        let error = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                gemini_temperature: Some(3.5),
                ..key_overrides()
            },
            ..LoadOptions::default()
        })
        .expect_err("load should fail");

        assert!(error.to_string().contains("gemini.temperature"));
    }

    #[test]
    fn config_file_patch_is_applied_with_interpolation() {
        let _guard = env_guard();
        clear_env();
        env::set_var("SABIO_TEST_INTERP_KEY", "file-key");

        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("sabio.toml");
        fs::write(
            &path,
            r#"
[gemini]
api_key = "${SABIO_TEST_INTERP_KEY}"
model = "gemini-1.5-pro"

[server]
port = 9000

[logging]
level = "debug"
format = "json"
"#,
        )
        .expect("write config");

        let config = AppConfig::load(LoadOptions {
            config_path: Some(path),
            ..LoadOptions::default()
        })
        .expect("load should succeed");

        assert_eq!(
            config.gemini.api_key.as_ref().map(|key| key.expose_secret().to_string()),
            Some("file-key".to_string())
        );
        assert_eq!(config.gemini.model, "gemini-1.5-pro");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);

        env::remove_var("SABIO_TEST_INTERP_KEY");
    }

    #[test]
    fn required_config_file_missing_is_an_error() {
        let _guard = env_guard();
        clear_env();

        let dir = TempDir::new().expect("tempdir");
        let missing = dir.path().join("absent.toml");
        let error = AppConfig::load(LoadOptions {
            config_path: Some(missing.clone()),
            require_file: true,
            overrides: key_overrides(),
        })
        .expect_err("load should fail");

        assert!(matches!(error, ConfigError::MissingConfigFile(path) if path == missing));
    }

    #[test]
    fn programmatic_overrides_win_over_env() {
        let _guard = env_guard();
        clear_env();
        env::set_var("SABIO_GEMINI_API_KEY", "env-key");
        env::set_var("SABIO_GEMINI_MODEL", "env-model");

        let config = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                gemini_api_key: Some("override-key".to_string()),
                gemini_model: Some("override-model".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("load should succeed");

        assert_eq!(
            config.gemini.api_key.as_ref().map(|key| key.expose_secret().to_string()),
            Some("override-key".to_string())
        );
        assert_eq!(config.gemini.model, "override-model");

        clear_env();
    }
}
