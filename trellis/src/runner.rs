//! Runners executing actual application logic.

#[cfg(test)]
use mockall::automock;
pub use trellis_di::ErrorPtr;

pub type ApplicationRunnerPtr = dyn ApplicationRunner + Send + Sync;

/// Runs application logic. Runners are run by the [Application](crate::application::Application)
/// and are discovered through the registry as elements with the [ApplicationRunnerPtr] alias:
///
/// ```
/// use trellis::runner::{ApplicationRunner, ApplicationRunnerPtr, ErrorPtr};
/// use trellis_di::alias_cast;
/// use trellis_di::element::ElementSource;
///
/// struct HelloRunner;
///
/// impl ApplicationRunner for HelloRunner {
///     fn run(&self) -> Result<(), ErrorPtr> {
///         println!("Hello world!");
///         Ok(())
///     }
/// }
///
/// let source = ElementSource::constructor(|_| Ok(HelloRunner))
///     .with_alias::<ApplicationRunnerPtr>(alias_cast!(HelloRunner => ApplicationRunnerPtr));
/// ```
#[cfg_attr(test, automock)]
pub trait ApplicationRunner {
    /// Runs any application code.
    fn run(&self) -> Result<(), ErrorPtr>;

    /// Returns the priority for this runner. Higher priorities get run first. Default 0.
    fn priority(&self) -> i8 {
        0
    }
}
