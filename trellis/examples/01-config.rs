// note: this example assumes you've analyzed the previous one

use trellis::application::Application;
use trellis::config::{ApplicationConfig, StaticApplicationConfigProvider};
use trellis::runner::{ApplicationRunner, ApplicationRunnerPtr, ErrorPtr};
use trellis_di::alias_cast;
use trellis_di::element::{ElementSeed, ElementSource};
use trellis_di::instance_provider::ElementInstancePtr;

// this simple runner will print a part of application config to prove everything works
struct ConfigPrinterRunner {
    // the application config is itself an element, so it can be injected like any other
    config: ElementInstancePtr<ApplicationConfig>,
}

impl ApplicationRunner for ConfigPrinterRunner {
    fn run(&self) -> Result<(), ErrorPtr> {
        println!("Using built-in logger: {}", self.config.install_tracing_logger);
        println!("Active profiles: {:?}", self.config.active_profiles);
        Ok(())
    }
}

fn main() {
    // application config is provided by an ApplicationConfigProvider, which by default uses
    // environment variables and a configuration file (see module documentation)
    // to provide your own, pass a different provider when creating the application; here we start
    // with a default config and override what's needed
    let mut config = ApplicationConfig::default();
    config.install_tracing_logger = false;
    config.active_profiles = vec!["example".to_string()];

    let application = Application::new(
        &StaticApplicationConfigProvider::new(config),
        [(
            ElementSeed::new("config_printer_runner"),
            ElementSource::constructor(|arguments| {
                Ok(ConfigPrinterRunner {
                    config: arguments.take()?,
                })
            })
            .with_parameter::<ElementInstancePtr<ApplicationConfig>>()
            .with_alias::<ApplicationRunnerPtr>(
                alias_cast!(ConfigPrinterRunner => ApplicationRunnerPtr),
            ),
        )],
    )
    .expect("unable to create application");

    // prints "Using built-in logger: false" "Active profiles: ["example"]"
    application.run().expect("error running application");
}
