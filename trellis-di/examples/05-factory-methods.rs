// note: this example assumes you've analyzed the previous one

use trellis_di::element::{ElementSeed, ElementSource};
use trellis_di::instance_provider::{ElementInstancePtr, TypedElementInstanceProvider};
use trellis_di::registry::ElementRegistryBuilder;

struct DatabaseConfig {
    url: String,
}

// some types are not constructed directly, but are created by other elements
struct ConnectionPool {
    config: ElementInstancePtr<DatabaseConfig>,
}

impl ConnectionPool {
    fn connection(&self, name: &str) -> Connection {
        Connection {
            description: format!("{} connected to {}", name, self.config.url),
        }
    }
}

struct Connection {
    description: String,
}

fn main() {
    let registry = ElementRegistryBuilder::default()
        .with_element(
            ElementSeed::new("config"),
            ElementSource::constructor(|_| {
                Ok(DatabaseConfig {
                    url: "postgres://localhost".to_string(),
                })
            }),
        )
        .with_element(
            ElementSeed::new("pool"),
            ElementSource::constructor(|arguments| {
                Ok(ConnectionPool {
                    config: arguments.take()?,
                })
            })
            .with_parameter::<ElementInstancePtr<DatabaseConfig>>(),
        )
        .with_element(
            ElementSeed::new("connection"),
            // a factory method is called on the parent element instance, which is resolved just
            // like any other dependency, and can have its own parameters
            ElementSource::factory_method::<ConnectionPool, _, _>("connection", |pool, _| {
                Ok(pool.connection("main"))
            }),
        )
        .build()
        .expect("error building ElementRegistry");

    let connection = registry
        .primary_instance_typed::<Connection>()
        .expect("error creating Connection");

    // prints "main connected to postgres://localhost"
    println!("{}", connection.description);
}
