use forge_accessor::AccessError;
use forge_core::prelude::*;
use forge_model::ValueKind;
use forge_test_utils::{init_tracing, Customer, Order, Product, Strict};
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::thread;

#[test]
fn test_defaults_follow_sequence() {
    init_tracing();
    let factories = FactorySet::new();

    let first = factories.to_build::<Customer>().build().unwrap();
    let second = factories.to_build::<Customer>().build().unwrap();

    assert_eq!((first.name.as_str(), first.level, first.vip), ("name#1", 1, true));
    assert_eq!((second.name.as_str(), second.level, second.vip), ("name#2", 2, false));
    assert!(first.address.is_none());
}

#[test]
fn test_sequences_are_per_type() {
    let factories = FactorySet::new();
    factories.to_build::<Customer>().build().unwrap();
    factories.to_build::<Customer>().build().unwrap();

    let product = factories.to_build::<Product>().build().unwrap();

    assert_eq!(product.name, "name#1");
    assert_eq!(factories.next_sequence::<Customer>(), 3);
}

#[test]
fn test_sequence_start_from_config() {
    let factories = FactorySet::with_config(ForgeConfig::new().with_sequence_start(100));
    let customer = factories.to_build::<Customer>().build().unwrap();
    assert_eq!(customer.name, "name#100");
}

#[test]
fn test_registered_default_policy() {
    let factories = FactorySet::new();
    factories.register_default(ValueKind::Text, |property, sequence| {
        Value::from(format!("{property}-{sequence:03}"))
    });

    let customer = factories.to_build::<Customer>().build().unwrap();

    assert_eq!(customer.name, "name-001");
    assert_eq!(customer.level, 1);
}

#[test]
fn test_override_values_are_converted() {
    let factories = FactorySet::new();

    let product = factories.to_build::<Product>().property("price", "250").build().unwrap();
    let order = factories.to_build::<Order>().property("amount", 12).build().unwrap();

    assert_eq!(product.price, 250);
    assert!((order.amount - 12.0).abs() < f64::EPSILON);
}

#[test]
fn test_registered_converter() {
    let factories = FactorySet::new();
    let err = factories
        .to_build::<Customer>()
        .property("level", true)
        .build()
        .unwrap_err();
    assert!(matches!(
        err,
        BuildError::AssignmentFailed { source: AccessError::TypeMismatch { .. }, .. }
    ));

    factories.register_converter(|converter| {
        converter.add_type_converter(ValueKind::Bool, ValueKind::Int, |value| {
            value.as_bool().map(|b| Value::Int(i64::from(b)))
        });
    });
    let customer = factories
        .to_build::<Customer>()
        .property("level", true)
        .build()
        .unwrap();
    assert_eq!(customer.level, 1);
}

#[test]
fn test_rejecting_setter_fails_build() {
    let factories = FactorySet::new();

    let err = factories
        .to_build::<Strict>()
        .property("quantity", 500)
        .build()
        .unwrap_err();

    match err {
        BuildError::AssignmentFailed {
            property,
            source: AccessError::SetterFailed { message, .. },
            ..
        } => {
            assert_eq!(property, "quantity");
            assert_eq!(message, "quantity 500 exceeds 100");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(factories.query::<Strict>(&Criteria::new()).unwrap().is_empty());
}

#[test]
fn test_read_only_property_is_left_alone_unless_specified() {
    let factories = FactorySet::new();

    let strict = factories.to_build::<Strict>().build().unwrap();
    assert_eq!((strict.quantity, strict.id), (1, 0));

    let err = factories.to_build::<Strict>().property("id", 9).build().unwrap_err();
    assert!(matches!(
        err,
        BuildError::AssignmentFailed { source: AccessError::NoSetter { .. }, .. }
    ));
}

#[test]
fn test_unknown_property() {
    let factories = FactorySet::new();
    let err = factories
        .to_build::<Customer>()
        .property("colour", "red")
        .build()
        .unwrap_err();
    assert!(matches!(err, BuildError::NoSuchProperty { ref property, .. } if property == "colour"));
    assert!(!err.is_configuration_error());
}

#[test]
fn test_params_reach_definitions_and_constructors() {
    let factories = FactorySet::new();
    factories
        .define::<Customer>(|spec| {
            if spec.param("vip").and_then(Value::as_bool) == Some(true) {
                spec.property("level").value(|| 10);
            }
        })
        .register::<Order>(|sequence, params| Order {
            lines: vec![format!("line-{sequence}")],
            note: params.get("note").and_then(Value::as_text).map(str::to_string),
            ..Order::default()
        });

    let vip = factories.to_build::<Customer>().param("vip", true).build().unwrap();
    let regular = factories.to_build::<Customer>().build().unwrap();
    assert_eq!(vip.level, 10);
    assert_eq!(regular.level, 2);

    let order = factories.to_build::<Order>().param("note", "fragile").build().unwrap();
    assert_eq!(order.lines, vec!["line-1".to_string()]);
    // scalar defaults run after the constructor
    assert_eq!(order.note.as_deref(), Some("note#1"));
}

#[test]
fn test_build_hooks_and_extensions() {
    let factories = FactorySet::new();
    factories
        .on_build::<Order>(|order, _, _| order.lines.push("base".into()))
        .extend::<Order>("bulk", |order, sequence, _| {
            order.lines.push(format!("bulk-{sequence}"));
        })
        .define_extension::<Order>("bulk", |spec| spec.property("note").value(|| "bulk order"));

    let plain = factories.to_build::<Order>().build().unwrap();
    let bulk = factories.to_build::<Order>().extend("bulk").build().unwrap();

    assert_eq!(plain.lines, vec!["base".to_string()]);
    assert_eq!(bulk.lines, vec!["base".to_string(), "bulk-2".to_string()]);
    assert_eq!(bulk.note.as_deref(), Some("bulk order"));
    assert_eq!(factories.factory::<Order>().extensions(), vec!["bulk".to_string()]);

    let err = factories.to_build::<Order>().extend("express").build().unwrap_err();
    assert!(matches!(err, BuildError::UnknownExtension { ref name, .. } if name == "express"));
}

#[test]
fn test_build_from_maps() {
    let factories = FactorySet::new();
    let overrides: Overrides = [
        ("note".to_string(), Value::Null),
        ("lines".to_string(), Value::from(vec!["a", "b"])),
    ]
    .into_iter()
    .collect();

    let order = factories.build::<Order>(overrides, Params::new()).unwrap();

    assert!(order.note.is_none());
    assert_eq!(order.lines, vec!["a".to_string(), "b".to_string()]);
    assert!((order.amount - 1.0).abs() < f64::EPSILON);
    assert_eq!(order.code, "code#1");
}

#[test]
fn test_concurrent_builds_get_distinct_sequences() {
    let factories = FactorySet::new();

    let names: Vec<String> = thread::scope(|scope| {
        let workers: Vec<_> = (0..4)
            .map(|_| {
                scope.spawn(|| {
                    (0..25)
                        .map(|_| factories.to_build::<Customer>().build().unwrap().name.clone())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        workers
            .into_iter()
            .flat_map(|worker| worker.join().unwrap())
            .collect()
    });

    let unique: HashSet<_> = names.iter().collect();
    assert_eq!(unique.len(), 100);
    assert_eq!(factories.query::<Customer>(&Criteria::new()).unwrap().len(), 100);
}

#[test]
fn test_clear_repository() {
    let factories = FactorySet::new();
    factories.to_build::<Customer>().build().unwrap();
    assert_eq!(factories.query::<Customer>(&Criteria::new()).unwrap().len(), 1);

    factories.clear_repository();

    assert!(factories.query::<Customer>(&Criteria::new()).unwrap().is_empty());
    assert_eq!(factories.next_sequence::<Customer>(), 2);
}

#[test]
fn test_config_from_toml() {
    let config = ForgeConfig::from_toml_str(
        r#"
        sequence_start = 10
        persist_on_build = false
        "#,
    )
    .unwrap();
    assert!(config.reuse_pending_references);

    let factories = FactorySet::with_config(config);
    let customer = factories.to_build::<Customer>().build().unwrap();

    assert_eq!(customer.name, "name#10");
    assert!(factories.query::<Customer>(&Criteria::new()).unwrap().is_empty());
}
