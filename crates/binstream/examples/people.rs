//! Write a few typed records to a temp file and read them back.
//!
//! Run with `cargo run -p binstream --example people`.

use binstream::{wire_enum, wire_record, StreamFactory, Value, WireType};

wire_enum! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Role {
        Engineer,
        Designer,
        Manager,
    }
}

wire_record! {
    #[derive(Debug, Default, PartialEq)]
    struct Person {
        name: String,
        role: Option<Role>,
        age: i32,
        nickname: Option<String>,
    }
}

fn main() -> binstream::Result<()> {
    let path = std::env::temp_dir().join(format!("binstream-people-{}.bin", std::process::id()));

    let factory = StreamFactory::new();
    factory.set_generic_records(true);

    let people = vec![
        Person {
            name: "Grace".into(),
            role: Some(Role::Engineer),
            age: 85,
            nickname: Some("Amazing Grace".into()),
        },
        Person {
            name: "Dieter".into(),
            role: Some(Role::Designer),
            age: 92,
            nickname: None,
        },
        Person {
            name: "Unassigned".into(),
            role: None,
            age: 0,
            nickname: None,
        },
    ];

    let written = factory.write_typed(&path, &people)?;
    println!("wrote {written} people to {}", path.display());

    for person in factory.open_read_typed::<Person>(&path)? {
        println!("{:?}", person?);
    }

    // The same file decodes without the Rust type, through the dynamic model.
    for value in factory.open_read(&path, &Person::wire_type())? {
        if let Value::Record(record) = value? {
            let fields: Vec<String> = record
                .fields()
                .map(|(name, value)| format!("{name}={}", binstream::codec::json::to_json(value)))
                .collect();
            println!("{} {{ {} }}", record.name(), fields.join(", "));
        }
    }

    let _ = std::fs::remove_file(&path);
    Ok(())
}
