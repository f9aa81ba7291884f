//! Schema derivation from type catalogs.

use std::sync::Arc;

use json_shape::{
    ConstructorDesc, Conversion, Deriver, FieldDesc, Schema, SchemaError, TypeCatalog, TypeDesc,
    Value, VariantMode,
};
use serde_json::json;

fn inventory_catalog() -> TypeCatalog {
    TypeCatalog::new()
        .with(
            "Item",
            TypeDesc::record([
                FieldDesc::required("name", TypeDesc::String),
                FieldDesc::required("count", TypeDesc::Int),
                FieldDesc::optional("price", TypeDesc::Float),
            ]),
        )
        .with(
            "Inventory",
            TypeDesc::record([
                FieldDesc::required("items", TypeDesc::list(TypeDesc::named("Item"))),
                FieldDesc::required("index", TypeDesc::map(TypeDesc::String, TypeDesc::Int)),
                FieldDesc::optional("updated", TypeDesc::Date),
                FieldDesc::optional("thumbnail", TypeDesc::Bytes),
            ]),
        )
}

#[test]
fn derives_records_in_declaration_order() {
    let deriver = Deriver::new(inventory_catalog());
    let schema = deriver.derive_named("Inventory").unwrap();
    let record = schema.as_record().unwrap();
    let names: Vec<&str> = record.fields().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["items", "index", "updated", "thumbnail"]);
    assert_eq!(record.field("items").unwrap().schema.kind(), "list");
    assert_eq!(record.field("index").unwrap().schema.kind(), "dictionary");
    assert_eq!(record.field("updated").unwrap().schema.kind(), "representation");
    assert!(record.field("updated").unwrap().optional);
}

#[test]
fn named_types_are_derived_once() {
    let deriver = Deriver::new(inventory_catalog());
    let first = deriver.derive_named("Item").unwrap();
    let second = deriver.derive_named("Item").unwrap();
    match (&first, &second) {
        (Schema::Record(a), Schema::Record(b)) => assert!(Arc::ptr_eq(a, b)),
        other => panic!("expected records, got {other:?}"),
    }

    // The element schema of Inventory.items is the cached Item schema.
    let inventory = deriver.derive_named("Inventory").unwrap();
    let items = &inventory.as_record().unwrap().field("items").unwrap().schema;
    match (items, &first) {
        (Schema::List(element), Schema::Record(item)) => match element.as_ref() {
            Schema::Record(element) => assert!(Arc::ptr_eq(element, item)),
            other => panic!("expected record element, got {other:?}"),
        },
        other => panic!("unexpected shapes {other:?}"),
    }
}

#[test]
fn concurrent_derivations_share_one_schema() {
    let deriver = Deriver::new(inventory_catalog());
    let schemas: Vec<Schema> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| scope.spawn(|| deriver.derive_named("Inventory").unwrap()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });
    let Schema::Record(first) = &schemas[0] else {
        panic!("expected record");
    };
    for schema in &schemas[1..] {
        let Schema::Record(other) = schema else {
            panic!("expected record");
        };
        assert!(Arc::ptr_eq(first, other));
    }
}

#[test]
fn unsupported_members_are_unrepresentable() {
    let catalog = TypeCatalog::new().with(
        "Widget",
        TypeDesc::record([
            FieldDesc::required("id", TypeDesc::Int),
            FieldDesc::required("on_click", TypeDesc::Unsupported("function".into())),
        ]),
    );
    let err = Deriver::new(catalog).derive_named("Widget").unwrap_err();
    assert_eq!(
        err,
        SchemaError::Unrepresentable {
            ty: "Widget.on_click".into(),
            reason: "function".into()
        }
    );
}

#[test]
fn unknown_named_type() {
    let deriver = Deriver::new(TypeCatalog::new());
    assert_eq!(
        deriver.derive_named("Ghost").unwrap_err(),
        SchemaError::UnknownType("Ghost".into())
    );
}

#[test]
fn self_reference_without_base_case_is_rejected() {
    let catalog = TypeCatalog::new().with(
        "Loop",
        TypeDesc::record([
            FieldDesc::required("id", TypeDesc::Int),
            FieldDesc::required("next", TypeDesc::named("Loop")),
        ]),
    );
    let deriver = Deriver::new(catalog);
    assert_eq!(
        deriver.derive_named("Loop").unwrap_err(),
        SchemaError::CyclicWithoutBase("Loop".into())
    );
    assert!(deriver.cached("Loop").is_none());
}

#[test]
fn mutual_recursion_through_an_optional_field() {
    let catalog = TypeCatalog::new()
        .with(
            "Employee",
            TypeDesc::record([
                FieldDesc::required("name", TypeDesc::String),
                FieldDesc::optional("team", TypeDesc::named("Team")),
            ]),
        )
        .with(
            "Team",
            TypeDesc::record([
                FieldDesc::required("lead", TypeDesc::named("Employee")),
                FieldDesc::required("members", TypeDesc::list(TypeDesc::named("Employee"))),
            ]),
        );
    let deriver = Deriver::new(catalog);
    let employee = deriver.derive_named("Employee").unwrap();
    let team = &employee.as_record().unwrap().field("team").unwrap().schema;
    let lead = &team.as_record().unwrap().field("lead").unwrap().schema;
    assert!(matches!(lead, Schema::Recursive(handle) if handle.name() == "Employee"));
    assert_eq!(lead.resolve().map(Schema::kind), Some("record"));
    assert!(deriver.cached("Team").is_some());
}

#[test]
fn recursive_variant_with_a_leaf_constructor() {
    let catalog = TypeCatalog::new().with(
        "Expr",
        TypeDesc::variants([
            ConstructorDesc::new("Lit").arg("value", TypeDesc::Int),
            ConstructorDesc::new("Add")
                .arg("left", TypeDesc::named("Expr"))
                .arg("right", TypeDesc::named("Expr")),
        ]),
    );
    let schema = Deriver::new(catalog).derive_named("Expr").unwrap();
    let variant = schema.as_variant().unwrap();
    assert_eq!(variant.mode(), VariantMode::Nested);
    assert_eq!(variant.constructors().len(), 2);
}

#[test]
fn single_record_argument_is_inlined() {
    let catalog = TypeCatalog::new()
        .with(
            "Circle",
            TypeDesc::record([FieldDesc::required("radius", TypeDesc::Float)]),
        )
        .with(
            "Shape",
            TypeDesc::variants([
                ConstructorDesc::new("Circle").arg("shape", TypeDesc::named("Circle")),
                ConstructorDesc::new("Square").arg("side", TypeDesc::Int),
                ConstructorDesc::new("Pair")
                    .arg("a", TypeDesc::named("Circle"))
                    .arg("b", TypeDesc::named("Circle")),
            ]),
        );
    let schema = Deriver::new(catalog).derive_named("Shape").unwrap();
    let variant = schema.as_variant().unwrap();
    let inlined: Vec<bool> = variant
        .constructors()
        .iter()
        .map(|c| c.inlined_record().is_some())
        .collect();
    assert_eq!(inlined, [true, false, false]);
}

#[test]
fn discriminants_switch_to_tag_match() {
    let catalog = TypeCatalog::new().with(
        "Gear",
        TypeDesc::variants([
            ConstructorDesc::new("Sword")
                .discriminant("type", json!("sword"))
                .arg("damage", TypeDesc::Int),
            ConstructorDesc::new("Shield")
                .discriminant("type", json!("shield"))
                .arg("armor", TypeDesc::Int),
        ]),
    );
    let schema = Deriver::new(catalog).derive_named("Gear").unwrap();
    let variant = schema.as_variant().unwrap();
    assert_eq!(variant.mode(), VariantMode::TagMatch);
    assert!(variant.is_union_key("type"));
    assert!(variant.is_union_key("armor"));
    assert!(!variant.is_union_key("weight"));
}

#[test]
fn mixed_tagging_is_ambiguous() {
    let catalog = TypeCatalog::new().with(
        "Gear",
        TypeDesc::variants([
            ConstructorDesc::new("Sword").discriminant("type", json!("sword")),
            ConstructorDesc::new("Shield"),
        ]),
    );
    let err = Deriver::new(catalog).derive_named("Gear").unwrap_err();
    assert!(matches!(err, SchemaError::AmbiguousVariantConfiguration { ty, .. } if ty == "Gear"));
}

#[test]
fn identical_discriminants_are_ambiguous() {
    let catalog = TypeCatalog::new().with(
        "Level",
        TypeDesc::variants([
            ConstructorDesc::new("Low").discriminant("level", json!(1)),
            ConstructorDesc::new("AlsoLow").discriminant("level", json!(1.0)),
        ]),
    );
    let err = Deriver::new(catalog).derive_named("Level").unwrap_err();
    assert!(matches!(err, SchemaError::AmbiguousVariantConfiguration { .. }));
}

#[test]
fn represented_types_derive_their_proxy() {
    let celsius = Conversion::new(
        "celsius",
        |value: &Value| {
            value
                .as_f64()
                .map(|k| Value::Float(k - 273.15))
                .ok_or_else(|| json_shape::ConversionError::new("expected kelvin"))
        },
        |proxy: Value| {
            proxy
                .as_f64()
                .map(|c| Value::Float(c + 273.15))
                .ok_or_else(|| json_shape::ConversionError::new("expected celsius"))
        },
    );
    let catalog = TypeCatalog::new().with(
        "Reading",
        TypeDesc::record([FieldDesc::required(
            "temperature",
            TypeDesc::represented(TypeDesc::Float, celsius),
        )]),
    );
    let schema = Deriver::new(catalog).derive_named("Reading").unwrap();
    let temperature = &schema.as_record().unwrap().field("temperature").unwrap().schema;
    let Schema::Representation(repr) = temperature else {
        panic!("expected representation, got {temperature:?}");
    };
    assert_eq!(repr.name(), "celsius");
    assert_eq!(repr.proxy().kind(), "float");
}
