//! Round-trip and projection properties over generated values.

use std::collections::BTreeMap;

use json_shape::{parse, write, ConstructorSpec, Schema, SchemaBuilder, Value};
use proptest::prelude::*;
use serde_json::json;

/// Every schema kind except representations.
fn order_schema() -> Schema {
    let t = SchemaBuilder::new();
    let delivery = t
        .variant(
            "Delivery",
            [
                ConstructorSpec::new("Pickup").matching("method", json!("pickup")),
                ConstructorSpec::new("Courier")
                    .matching("method", json!("courier"))
                    .arg("eta", t.int()),
                ConstructorSpec::new("Post")
                    .matching("method", json!("post"))
                    .matching("tracked", json!(true))
                    .arg(
                        "address",
                        t.record("Address", [t.field("city", t.str()), t.opt("zip", t.str())])
                            .unwrap(),
                    ),
            ],
        )
        .unwrap();
    let line = t
        .record(
            "Line",
            [
                t.field("sku", t.str()),
                t.field("quantity", t.int()),
                t.opt("discount", t.float()),
            ],
        )
        .unwrap();
    let payment = t
        .variant(
            "Payment",
            [
                ConstructorSpec::new("Card")
                    .arg("last4", t.str())
                    .arg("expires", t.int()),
                ConstructorSpec::new("Voucher").arg(
                    "voucher",
                    t.record("Voucher", [t.field("code", t.str())]).unwrap(),
                ),
                ConstructorSpec::new("Cash"),
            ],
        )
        .unwrap();
    t.record(
        "Order",
        [
            t.field("id", t.int()),
            t.field("paid", t.bool()),
            t.field("total", t.float()),
            t.field("lines", t.list(line)),
            t.field("attributes", t.dict(t.str(), t.str())),
            t.field("payment", payment),
            t.field("delivery", delivery),
            t.opt("note", t.str()),
        ],
    )
    .unwrap()
}

fn finite() -> impl Strategy<Value = f64> {
    any::<f64>().prop_filter("finite", |f| f.is_finite())
}

fn line() -> impl Strategy<Value = Value> {
    (any::<String>(), any::<i64>(), proptest::option::of(finite())).prop_map(
        |(sku, quantity, discount)| {
            let mut fields = vec![
                ("sku", Value::Str(sku)),
                ("quantity", Value::Int(quantity)),
            ];
            if let Some(discount) = discount {
                fields.push(("discount", Value::Float(discount)));
            }
            Value::record(fields)
        },
    )
}

fn payment() -> impl Strategy<Value = Value> {
    prop_oneof![
        ("[0-9]{4}", any::<i64>()).prop_map(|(last4, expires)| {
            Value::variant("Card", vec![Value::Str(last4), Value::Int(expires)])
        }),
        any::<String>().prop_map(|code| {
            Value::variant("Voucher", vec![Value::record([("code", Value::Str(code))])])
        }),
        Just(Value::unit("Cash")),
    ]
}

fn delivery() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::unit("Pickup")),
        any::<i64>().prop_map(|eta| Value::variant("Courier", vec![Value::Int(eta)])),
        (any::<String>(), proptest::option::of(any::<String>())).prop_map(|(city, zip)| {
            let mut fields = vec![("city", Value::Str(city))];
            if let Some(zip) = zip {
                fields.push(("zip", Value::Str(zip)));
            }
            Value::variant("Post", vec![Value::record(fields)])
        }),
    ]
}

fn order() -> impl Strategy<Value = Value> {
    (
        any::<i64>(),
        any::<bool>(),
        finite(),
        prop::collection::vec(line(), 0..4),
        // Unique keys: duplicates collapse when parsed.
        prop::collection::btree_map(any::<String>(), any::<String>(), 0..4),
        payment(),
        delivery(),
        proptest::option::of(any::<String>()),
    )
        .prop_map(|(id, paid, total, lines, attributes, payment, delivery, note)| {
            let attributes: BTreeMap<String, String> = attributes;
            let mut fields = vec![
                ("id", Value::Int(id)),
                ("paid", Value::Bool(paid)),
                ("total", Value::Float(total)),
                ("lines", Value::List(lines)),
                (
                    "attributes",
                    Value::dict(
                        attributes
                            .into_iter()
                            .map(|(k, v)| (Value::Str(k), Value::Str(v))),
                    ),
                ),
                ("payment", payment),
                ("delivery", delivery),
            ];
            if let Some(note) = note {
                fields.push(("note", Value::Str(note)));
            }
            Value::record(fields)
        })
}

proptest! {
    #[test]
    fn parse_inverts_write(value in order()) {
        let schema = order_schema();
        let bytes = write(&value, &schema).unwrap();
        let parsed = parse(&bytes, &schema).unwrap();
        prop_assert_eq!(parsed, value);
    }

    #[test]
    fn writer_output_is_valid_json(value in order()) {
        let bytes = write(&value, &order_schema()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        prop_assert!(json.is_object());
    }

    #[test]
    fn narrower_schema_sees_only_its_fields(value in order()) {
        let t = SchemaBuilder::new();
        let narrow = t
            .record("OrderSummary", [t.field("id", t.int()), t.field("paid", t.bool())])
            .unwrap();
        let bytes = write(&value, &order_schema()).unwrap();
        let parsed = parse(&bytes, &narrow).unwrap();
        let expected = Value::record([
            ("id", value.get("id").cloned().unwrap()),
            ("paid", value.get("paid").cloned().unwrap()),
        ]);
        prop_assert_eq!(parsed, expected);
    }
}
