use trellis::application::Application;
use trellis::config::DefaultApplicationConfigProvider;
use trellis::runner::{ApplicationRunner, ApplicationRunnerPtr, ErrorPtr};
use trellis_di::alias_cast;
use trellis_di::element::{ElementSeed, ElementSource};

// this is an application runner, which will run when the application starts; the framework will
// find it in the registry by its ApplicationRunnerPtr alias
struct HelloWorldRunner;

impl ApplicationRunner for HelloWorldRunner {
    fn run(&self) -> Result<(), ErrorPtr> {
        println!("Hello world!");
        Ok(())
    }
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    // create our application with config taken from the environment and an optional config file
    let application = Application::new(
        &DefaultApplicationConfigProvider::new(),
        [(
            ElementSeed::new("hello_world_runner"),
            ElementSource::constructor(|_| Ok(HelloWorldRunner))
                .with_alias::<ApplicationRunnerPtr>(
                    alias_cast!(HelloWorldRunner => ApplicationRunnerPtr),
                ),
        )],
    )
    .expect("unable to create application");

    // prints "Hello world!"
    application.run().expect("error running application");
}
