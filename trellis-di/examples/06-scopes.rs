// note: this example assumes you've analyzed the previous one

use std::sync::Mutex;
use trellis_di::alias_cast;
use trellis_di::element::{ElementSeed, ElementSource};
use trellis_di::instance_provider::{ElementInstancePtr, TypedElementInstanceProvider};
use trellis_di::registry::ElementRegistryBuilder;
use trellis_di::scope::Scope;

trait TestTrait {
    fn foo(&self);
}

struct TestDependency {
    // this is some example state which is not shared between other instances of this element
    some_state: Mutex<i32>,
}

impl TestTrait for TestDependency {
    fn foo(&self) {
        if let Ok(mut some_state) = self.some_state.lock() {
            *some_state += 1;
            println!("{}", some_state);
        }
    }
}

struct TestElement {
    dependency_1: ElementInstancePtr<dyn TestTrait + Send + Sync>,
    dependency_2: ElementInstancePtr<dyn TestTrait + Send + Sync>,
}

impl TestElement {
    fn call_foo(&self) {
        self.dependency_1.foo();
        self.dependency_2.foo();
    }
}

fn main() {
    let registry = ElementRegistryBuilder::default()
        .with_element(
            // scopes decide when to create and when to reuse instances
            // prototypes are created on every request, which is useful for stateful elements;
            // please see the scope module docs for more information
            ElementSeed::new("test_dependency").with_scope(Scope::Prototype),
            ElementSource::constructor(|_| {
                // to show we're constructed on each request, let's print some info
                println!("TestDependency created!");
                Ok(TestDependency {
                    some_state: Mutex::default(),
                })
            })
            .with_alias::<dyn TestTrait + Send + Sync>(
                alias_cast!(TestDependency => dyn TestTrait + Send + Sync),
            ),
        )
        .with_element(
            ElementSeed::new("test_element"),
            ElementSource::constructor(|arguments| {
                Ok(TestElement {
                    dependency_1: arguments.take()?,
                    dependency_2: arguments.take()?,
                })
            })
            .with_parameter::<ElementInstancePtr<dyn TestTrait + Send + Sync>>()
            .with_parameter::<ElementInstancePtr<dyn TestTrait + Send + Sync>>(),
        )
        .build()
        .expect("error building ElementRegistry");

    // prints "TestDependency created!" "TestDependency created!"
    let element = registry
        .primary_instance_typed::<TestElement>()
        .expect("error creating TestElement");

    // prints "1" "1" instead of "1" "2"
    element.call_foo();
}
