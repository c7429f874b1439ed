// note: this example assumes you've analyzed the previous one

use std::collections::HashMap;
use trellis_di::alias_cast;
use trellis_di::element::{ElementSeed, ElementSource};
use trellis_di::instance_provider::{ElementInstancePtr, TypedElementInstanceProvider};
use trellis_di::registry::ElementRegistryBuilder;

trait Plugin {
    fn name(&self) -> &'static str;
}

struct FirstPlugin;

impl Plugin for FirstPlugin {
    fn name(&self) -> &'static str {
        "first"
    }
}

struct SecondPlugin;

impl Plugin for SecondPlugin {
    fn name(&self) -> &'static str {
        "second"
    }
}

trait Missing {}

struct TestElement {
    // all elements assignable to dyn Plugin, ordered by priority
    all: Vec<ElementInstancePtr<dyn Plugin + Send + Sync>>,
    // all elements assignable to dyn Plugin, keyed by element name
    by_name: HashMap<String, ElementInstancePtr<dyn Plugin + Send + Sync>>,
    // an optional dependency is None when nothing can be injected
    missing: Option<ElementInstancePtr<dyn Missing + Send + Sync>>,
}

fn main() {
    let registry = ElementRegistryBuilder::default()
        .with_element(
            ElementSeed::new("first_plugin"),
            ElementSource::constructor(|_| Ok(FirstPlugin))
                .with_alias::<dyn Plugin + Send + Sync>(
                    alias_cast!(FirstPlugin => dyn Plugin + Send + Sync),
                ),
        )
        .with_element(
            // higher priority elements come first in collections
            ElementSeed::new("second_plugin").with_priority(10),
            ElementSource::constructor(|_| Ok(SecondPlugin))
                .with_alias::<dyn Plugin + Send + Sync>(
                    alias_cast!(SecondPlugin => dyn Plugin + Send + Sync),
                ),
        )
        .with_element(
            ElementSeed::new("test_element"),
            ElementSource::constructor(|arguments| {
                Ok(TestElement {
                    all: arguments.take()?,
                    by_name: arguments.take()?,
                    missing: arguments.take()?,
                })
            })
            .with_parameter::<Vec<ElementInstancePtr<dyn Plugin + Send + Sync>>>()
            .with_parameter::<HashMap<String, ElementInstancePtr<dyn Plugin + Send + Sync>>>()
            .with_parameter::<Option<ElementInstancePtr<dyn Missing + Send + Sync>>>(),
        )
        .build()
        .expect("error building ElementRegistry");

    let element = registry
        .primary_instance_typed::<TestElement>()
        .expect("error creating TestElement");

    // prints "second" "first"
    for plugin in &element.all {
        println!("{}", plugin.name());
    }

    // prints "first"
    println!("{}", element.by_name["first_plugin"].name());

    // prints "true"
    println!("{}", element.missing.is_none());
}
