// note: this example assumes you've analyzed the previous one

use once_cell::sync::OnceCell;
use trellis_di::element::{ElementSeed, ElementSource, FieldDescriptor, LifecycleHook};
use trellis_di::instance_provider::{ElementInstancePtr, TypedElementInstanceProvider};
use trellis_di::registry::ElementRegistryBuilder;

struct Greeting {
    text: &'static str,
}

// fields are injected after construction, so they need interior mutability
#[derive(Default)]
struct Greeter {
    greeting: OnceCell<ElementInstancePtr<Greeting>>,
}

impl Greeter {
    fn greet(&self) {
        if let Some(greeting) = self.greeting.get() {
            println!("{}", greeting.text);
        }
    }
}

fn main() {
    let registry = ElementRegistryBuilder::default()
        .with_element(
            ElementSeed::new("greeting"),
            ElementSource::constructor(|_| Ok(Greeting { text: "Hello world!" })),
        )
        .with_element(
            ElementSeed::new("greeter"),
            ElementSource::constructor(|_| Ok(Greeter::default()))
                // injected fields are resolved just like constructor parameters
                .with_field(FieldDescriptor::new::<Greeter, ElementInstancePtr<Greeting>, _>(
                    "greeting",
                    |greeter, greeting| {
                        greeter.greeting.set(greeting).ok();
                        Ok(())
                    },
                ))
                // lifecycle hooks are invoked after all fields are injected
                .with_hook(LifecycleHook::new::<Greeter, _>("greet", |greeter| {
                    greeter.greet();
                    Ok(())
                })),
        )
        .build()
        .expect("error building ElementRegistry");

    // prints "Hello world!" once, since the greeter is a singleton
    registry
        .primary_instance_typed::<Greeter>()
        .expect("error creating Greeter");
    registry
        .primary_instance_typed::<Greeter>()
        .expect("error creating Greeter");
}
