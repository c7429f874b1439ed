// note: this example assumes you've analyzed the previous one

use trellis_di::alias_cast;
use trellis_di::element::{ElementSeed, ElementSource};
use trellis_di::instance_provider::TypedElementInstanceProvider;
use trellis_di::registry::ElementRegistryBuilder;

trait Storage {
    fn describe(&self) -> &'static str;
}

struct MemoryStorage;

impl Storage for MemoryStorage {
    fn describe(&self) -> &'static str {
        "in-memory storage"
    }
}

struct DiskStorage;

impl Storage for DiskStorage {
    fn describe(&self) -> &'static str {
        "disk storage"
    }
}

fn main() {
    // elements can be registered conditionally, depending on which profiles are active - this way
    // different implementations can be used in different environments
    let registry = ElementRegistryBuilder::default()
        .with_active_profiles(["test"])
        .with_element(
            // registered only when "test" is active
            ElementSeed::new("memory_storage").with_required_profile("test"),
            ElementSource::constructor(|_| Ok(MemoryStorage))
                .with_alias::<dyn Storage + Send + Sync>(
                    alias_cast!(MemoryStorage => dyn Storage + Send + Sync),
                ),
        )
        .with_element(
            // registered only when "test" is not active
            ElementSeed::new("disk_storage").with_forbidden_profile("test"),
            ElementSource::constructor(|_| Ok(DiskStorage))
                .with_alias::<dyn Storage + Send + Sync>(
                    alias_cast!(DiskStorage => dyn Storage + Send + Sync),
                ),
        )
        .build()
        .expect("error building ElementRegistry");

    let storage = registry
        .primary_instance_typed::<dyn Storage + Send + Sync>()
        .expect("error creating Storage");

    // prints "in-memory storage"
    println!("{}", storage.describe());
}
