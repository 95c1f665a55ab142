use config::{Config, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use std::env;
use std::path::PathBuf;
use tracing::debug;

pub mod env_vars;
pub mod models;

pub use models::*;

/// Loads configuration from `config/default.*`, `config/{RUN_ENV}.*` and
/// `PAWTRIPS__*` environment variables, in that order of precedence.
///
/// The directory defaults to `./config` and can be moved with `CONFIG_DIR`.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    ensure_dotenv_loaded();

    let run_env = env::var("RUN_ENV").unwrap_or_else(|_| "debug".to_string());
    let prefix = env_vars::get_config_prefix();
    let config_dir = PathBuf::from(env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string()));

    let default_path = config_dir.join("default");
    let env_path = config_dir.join(&run_env);
    debug!(
        "loading config from {} and {} (RUN_ENV={})",
        default_path.display(),
        env_path.display(),
        run_env
    );

    let builder = Config::builder()
        .add_source(File::with_name(&default_path.to_string_lossy()).required(false))
        .add_source(File::with_name(&env_path.to_string_lossy()).required(false))
        .add_source(Environment::with_prefix(&prefix).separator("__"));

    let raw_config: AppConfig = builder.build()?.try_deserialize()?;
    apply_env_overrides_from_marker(raw_config)
}

/// Replaces `"secret_from_env"` markers in an already deserialized config.
pub fn apply_env_overrides_from_marker(config: AppConfig) -> Result<AppConfig, ConfigError> {
    let mut json = serde_json::to_value(&config)
        .map_err(|err| ConfigError::Message(format!("failed to serialize config: {err}")))?;
    env_vars::inject_env_vars(&mut json);
    serde_json::from_value(json)
        .map_err(|err| ConfigError::Message(format!("config invalid after secret injection: {err}")))
}

static INIT_DOTENV: OnceCell<()> = OnceCell::new();

/// Loads the dotenv file once per process and returns the path that was used.
///
/// `DOTENV_OVERRIDE` wins, then a first CLI argument starting with `.env`,
/// then `.env`.
pub fn ensure_dotenv_loaded() -> String {
    let dotenv_path_override = env::var("DOTENV_OVERRIDE").ok();
    let dotenv_path_arg = env::args().nth(1).filter(|s| s.starts_with(".env"));

    let dotenv_path = dotenv_path_override
        .or(dotenv_path_arg)
        .unwrap_or_else(|| ".env".to_string());

    INIT_DOTENV.get_or_init(|| {
        dotenv::from_filename(&dotenv_path).ok();
    });

    dotenv_path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marker_without_env_becomes_none() {
        let config = AppConfig {
            admin: Some(AdminConfig {
                api_key: Some("secret_from_env".to_string()),
            }),
            ..Default::default()
        };
        // No PAWTRIPS_SECRET_ADMIN_API_KEY / ADMIN_API_KEY in the test env.
        if env::var("PAWTRIPS_SECRET_ADMIN_API_KEY").is_err() && env::var("ADMIN_API_KEY").is_err() {
            let config = apply_env_overrides_from_marker(config).unwrap();
            assert!(config.admin.unwrap().api_key.is_none());
        }
    }

    #[test]
    fn defaults_are_applied_for_missing_sections() {
        let json = serde_json::json!({ "server": { "host": "0.0.0.0", "port": 9000 } });
        let config: AppConfig = serde_json::from_value(json).unwrap();
        assert_eq!(config.server.port, 9000);
        assert!(!config.use_stripe);
        assert_eq!(config.cancellation.token_ttl_hours, 72);
        assert_eq!(config.cancellation.min_hours_before_start, 48);
        assert_eq!(config.http.max_retries, 3);
        assert!(config.stripe.is_none());
    }
}
