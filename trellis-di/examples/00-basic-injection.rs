use trellis_di::alias_cast;
use trellis_di::element::{ElementSeed, ElementSource};
use trellis_di::instance_provider::{ElementInstancePtr, TypedElementInstanceProvider};
use trellis_di::registry::ElementRegistryBuilder;

// this is a trait we would like to use in our element
trait TestTrait {
    fn foo(&self);
}

// this is a dependency which implements the above trait
struct TestDependency;

impl TestTrait for TestDependency {
    fn foo(&self) {
        println!("Hello world!");
    }
}

// this is another element, but with a dependency
struct TestElement {
    // the registry will know how to inject dyn TestTrait, since TestDependency declares it as an
    // alias
    dependency: ElementInstancePtr<dyn TestTrait + Send + Sync>,
    // alternatively, you can inject the concrete type
    // dependency: ElementInstancePtr<TestDependency>,
}

impl TestElement {
    fn call_foo(&self) {
        self.dependency.foo();
    }
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    // elements are described by a seed (name, scope, etc.) and a source (how to construct them)
    // and registered in an ElementRegistry
    let registry = ElementRegistryBuilder::default()
        .with_element(
            ElementSeed::new("test_dependency"),
            // we're telling the registry to provide TestDependency when asked for dyn TestTrait
            ElementSource::constructor(|_| Ok(TestDependency))
                .with_alias::<dyn TestTrait + Send + Sync>(
                    alias_cast!(TestDependency => dyn TestTrait + Send + Sync),
                ),
        )
        .with_element(
            ElementSeed::new("test_element"),
            // constructor parameters are resolved in declaration order and taken from arguments
            // in the same order
            ElementSource::constructor(|arguments| {
                Ok(TestElement {
                    dependency: arguments.take()?,
                })
            })
            .with_parameter::<ElementInstancePtr<dyn TestTrait + Send + Sync>>(),
        )
        .build()
        .expect("error building ElementRegistry");

    let element = registry
        .primary_instance_typed::<TestElement>()
        .expect("error creating TestElement");

    // prints "Hello world!"
    element.call_foo();
}
