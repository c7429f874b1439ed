//! Core application framework functionality.

use crate::config::{ApplicationConfig, ApplicationConfigProvider};
use crate::runner::ApplicationRunnerPtr;
use std::cmp::Reverse;
use thiserror::Error;
use tracing::info;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::EnvFilter;
use trellis_di::element::{ElementSeed, ElementSource};
use trellis_di::instance_provider::TypedElementInstanceProvider;
use trellis_di::registry::{ElementRegistry, ElementRegistryBuilder};
use trellis_di::{ElementDefinitionRegistryError, ElementInstanceProviderError, ErrorPtr};

/// Name of the element holding [ApplicationConfig].
pub const CONFIG_ELEMENT_NAME: &str = "application_config";

#[derive(Clone, Error, Debug)]
pub enum ApplicationError {
    #[error("Error retrieving application config: {0}")]
    ConfigError(ErrorPtr),
    #[error("Error registering elements: {0}")]
    RegistryError(#[from] ElementDefinitionRegistryError),
    #[error("Error initializing singletons: {0}")]
    InitializationError(ElementInstanceProviderError),
    #[error("Error retrieving runners: {0}")]
    RunnerInjectionError(ElementInstanceProviderError),
    #[error("Runner error: {0}")]
    RunnerError(ErrorPtr),
}

fn install_tracing_logger() -> DefaultGuard {
    tracing::subscriber::set_default(
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .finish(),
    )
}

/// Main entrypoint for the application. Bootstraps the element registry and runs
/// [ApplicationRunners](crate::runner::ApplicationRunner).
pub struct Application {
    config: ApplicationConfig,
    registry: ElementRegistry,
}

impl Application {
    /// Creates an application from given elements, filtered by profiles active in the config.
    /// The config itself is registered as an element named [CONFIG_ELEMENT_NAME].
    pub fn new<P, I>(config_provider: &P, elements: I) -> Result<Self, ApplicationError>
    where
        P: ApplicationConfigProvider + ?Sized,
        I: IntoIterator<Item = (ElementSeed, ElementSource)>,
    {
        let config = config_provider
            .config()
            .map_err(ApplicationError::ConfigError)?;

        let config_element = config.clone();
        let registry = ElementRegistryBuilder::default()
            .with_active_profiles(config.active_profiles.iter())
            .with_element(
                ElementSeed::new(CONFIG_ELEMENT_NAME),
                ElementSource::constructor(move |_| Ok(config_element.clone())),
            )
            .with_elements(elements)
            .build()?;

        Ok(Self { config, registry })
    }

    #[inline]
    pub fn config(&self) -> &ApplicationConfig {
        &self.config
    }

    #[inline]
    pub fn registry(&self) -> &ElementRegistry {
        &self.registry
    }

    /// Initializes singletons, if enabled, and then runs all runners ordered by priority. Stops on
    /// the first runner error.
    pub fn run(&self) -> Result<(), ApplicationError> {
        let _logger_guard = self
            .config
            .install_tracing_logger
            .then(install_tracing_logger);

        if self.config.eager_singletons {
            info!("Initializing singleton elements...");

            self.registry
                .initialize()
                .map_err(ApplicationError::InitializationError)?;
        }

        info!("Searching for application runners...");

        let mut runners = self
            .registry
            .instances_typed::<ApplicationRunnerPtr>()
            .map_err(ApplicationError::RunnerInjectionError)?;

        runners.sort_by_key(|runner| Reverse(runner.priority()));

        info!("Running application runners...");

        for runner in &runners {
            runner.run().map_err(ApplicationError::RunnerError)?;
        }

        Ok(())
    }

    /// Consumes the application and releases all elements.
    pub fn shutdown(self) {
        info!("Shutting down application...");
        self.registry.shutdown();
    }
}
