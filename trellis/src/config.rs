//! Framework configuration is based on an [ApplicationConfigProvider], which is used to retrieve
//! [ApplicationConfig]. [Application](crate::application::Application) uses this config to
//! configure itself and registers it as an element, so it can also be injected into any other
//! element.
//!
//! [DefaultApplicationConfigProvider] creates the config with opinionated default values, which
//! can then be overwritten by a `trellis.json` file or environment variables prefixed with
//! `TRELLIS_`. Lists, like active profiles, are comma separated in environment variables, e.g.
//! `TRELLIS_ACTIVE_PROFILES=dev,local`.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use derive_more::Constructor;
#[cfg(test)]
use mockall::automock;
use serde::Deserialize;
use std::sync::Arc;
use trellis_di::ErrorPtr;

const CONFIG_ENV_PREFIX: &str = "TRELLIS";
const LIST_SEPARATOR: &str = ",";
const ACTIVE_PROFILES_KEY: &str = "active_profiles";

/// Name of the default config file.
pub const CONFIG_FILE: &str = "trellis.json";

/// Framework configuration which can be provided by an [ApplicationConfigProvider].
#[non_exhaustive]
#[derive(Clone, Debug)]
pub struct ApplicationConfig {
    /// Should a default tracing logger be installed in the scope of the application.
    pub install_tracing_logger: bool,
    /// Profiles used to filter registered elements.
    pub active_profiles: Vec<String>,
    /// Should all singleton elements be created before running the application.
    pub eager_singletons: bool,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            install_tracing_logger: true,
            active_profiles: vec![],
            eager_singletons: true,
        }
    }
}

impl From<OptionalApplicationConfig> for ApplicationConfig {
    fn from(value: OptionalApplicationConfig) -> Self {
        let default = Self::default();
        Self {
            install_tracing_logger: value
                .install_tracing_logger
                .unwrap_or(default.install_tracing_logger),
            active_profiles: value.active_profiles.unwrap_or(default.active_profiles),
            eager_singletons: value.eager_singletons.unwrap_or(default.eager_singletons),
        }
    }
}

impl ApplicationConfig {
    fn init_from_environment() -> Result<Self, ConfigError> {
        Self::init_from_builder(
            Config::builder()
                .add_source(File::with_name(CONFIG_FILE).required(false))
                .add_source(environment()),
        )
    }

    fn init_from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        builder
            .build()
            .and_then(|config| config.try_deserialize::<OptionalApplicationConfig>())
            .map(|config| config.into())
    }
}

fn environment() -> Environment {
    Environment::with_prefix(CONFIG_ENV_PREFIX)
        .try_parsing(true)
        .list_separator(LIST_SEPARATOR)
        .with_list_parse_key(ACTIVE_PROFILES_KEY)
}

/// Provider for [ApplicationConfig].
#[cfg_attr(test, automock)]
pub trait ApplicationConfigProvider {
    fn config(&self) -> Result<ApplicationConfig, ErrorPtr>;
}

/// Reads the config from `trellis.json` and the environment once, on creation.
#[derive(Clone, Debug)]
pub struct DefaultApplicationConfigProvider {
    // cached init result
    config: Result<ApplicationConfig, ErrorPtr>,
}

impl DefaultApplicationConfigProvider {
    pub fn new() -> Self {
        Self {
            config: ApplicationConfig::init_from_environment()
                .map_err(|error| Arc::new(error) as ErrorPtr),
        }
    }
}

impl Default for DefaultApplicationConfigProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplicationConfigProvider for DefaultApplicationConfigProvider {
    fn config(&self) -> Result<ApplicationConfig, ErrorPtr> {
        self.config.clone()
    }
}

/// Provides a fixed config, e.g. built in code or in tests.
#[derive(Constructor, Clone, Debug)]
pub struct StaticApplicationConfigProvider {
    config: ApplicationConfig,
}

impl ApplicationConfigProvider for StaticApplicationConfigProvider {
    fn config(&self) -> Result<ApplicationConfig, ErrorPtr> {
        Ok(self.config.clone())
    }
}

#[derive(Deserialize)]
struct OptionalApplicationConfig {
    install_tracing_logger: Option<bool>,
    active_profiles: Option<Vec<String>>,
    eager_singletons: Option<bool>,
}
