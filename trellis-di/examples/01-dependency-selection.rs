// note: this example assumes you've analyzed the previous one

use trellis_di::alias_cast;
use trellis_di::element::{ElementSeed, ElementSource};
use trellis_di::instance_provider::{ElementInstancePtr, TypedElementInstanceProvider};
use trellis_di::registry::ElementRegistryBuilder;

trait TestTrait {
    fn foo(&self);
}

struct TestDependency1;

impl TestTrait for TestDependency1 {
    fn foo(&self) {
        println!("TestDependency1");
    }
}

struct TestDependency2;

impl TestTrait for TestDependency2 {
    fn foo(&self) {
        println!("TestDependency2");
    }
}

struct TestElement {
    // with multiple elements assignable to dyn TestTrait, the one marked as primary is injected
    primary: ElementInstancePtr<dyn TestTrait + Send + Sync>,
    // a specific element can always be selected by name
    named: ElementInstancePtr<dyn TestTrait + Send + Sync>,
}

impl TestElement {
    fn call_foo(&self) {
        self.primary.foo();
        self.named.foo();
    }
}

fn main() {
    let registry = ElementRegistryBuilder::default()
        .with_element(
            ElementSeed::new("dependency_1"),
            ElementSource::constructor(|_| Ok(TestDependency1))
                .with_alias::<dyn TestTrait + Send + Sync>(
                    alias_cast!(TestDependency1 => dyn TestTrait + Send + Sync),
                ),
        )
        .with_element(
            // without the primary marker, requesting a single dyn TestTrait would be ambiguous
            ElementSeed::new("dependency_2").primary(),
            ElementSource::constructor(|_| Ok(TestDependency2))
                .with_alias::<dyn TestTrait + Send + Sync>(
                    alias_cast!(TestDependency2 => dyn TestTrait + Send + Sync),
                ),
        )
        .with_element(
            ElementSeed::new("test_element"),
            ElementSource::constructor(|arguments| {
                Ok(TestElement {
                    primary: arguments.take()?,
                    named: arguments.take()?,
                })
            })
            .with_parameter::<ElementInstancePtr<dyn TestTrait + Send + Sync>>()
            .with_named_parameter::<ElementInstancePtr<dyn TestTrait + Send + Sync>, _>(
                "dependency_1",
            ),
        )
        .build()
        .expect("error building ElementRegistry");

    let element = registry
        .primary_instance_typed::<TestElement>()
        .expect("error creating TestElement");

    // prints "TestDependency2" "TestDependency1"
    element.call_foo();
}
