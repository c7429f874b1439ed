// note: this example assumes you've analyzed the previous one

use trellis::application::Application;
use trellis::config::DefaultApplicationConfigProvider;
use trellis::runner::{ApplicationRunner, ApplicationRunnerPtr, ErrorPtr};
use trellis_di::alias_cast;
use trellis_di::element::{ElementSeed, ElementSource};

struct PrintHelloRunner;

impl ApplicationRunner for PrintHelloRunner {
    fn run(&self) -> Result<(), ErrorPtr> {
        print!("Hello ");
        Ok(())
    }

    // for ordered execution of application runners, priorities can be used
    fn priority(&self) -> i8 {
        3
    }
}

struct PrintWorldRunner;

impl ApplicationRunner for PrintWorldRunner {
    fn run(&self) -> Result<(), ErrorPtr> {
        print!("world");
        Ok(())
    }

    fn priority(&self) -> i8 {
        2
    }
}

struct PrintExclamationRunner;

impl ApplicationRunner for PrintExclamationRunner {
    fn run(&self) -> Result<(), ErrorPtr> {
        println!("!");
        Ok(())
    }

    fn priority(&self) -> i8 {
        1
    }
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    // registration order doesn't matter - runners are sorted by their priority
    let application = Application::new(
        &DefaultApplicationConfigProvider::new(),
        [
            (
                ElementSeed::new("print_exclamation_runner"),
                ElementSource::constructor(|_| Ok(PrintExclamationRunner))
                    .with_alias::<ApplicationRunnerPtr>(
                        alias_cast!(PrintExclamationRunner => ApplicationRunnerPtr),
                    ),
            ),
            (
                ElementSeed::new("print_world_runner"),
                ElementSource::constructor(|_| Ok(PrintWorldRunner))
                    .with_alias::<ApplicationRunnerPtr>(
                        alias_cast!(PrintWorldRunner => ApplicationRunnerPtr),
                    ),
            ),
            (
                ElementSeed::new("print_hello_runner"),
                ElementSource::constructor(|_| Ok(PrintHelloRunner))
                    .with_alias::<ApplicationRunnerPtr>(
                        alias_cast!(PrintHelloRunner => ApplicationRunnerPtr),
                    ),
            ),
        ],
    )
    .expect("unable to create application");

    // prints "Hello world!"
    application.run().expect("error running application");
}
