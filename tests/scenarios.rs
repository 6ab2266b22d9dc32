use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use contract_bridge::error::BridgeResult;
use contract_bridge::primitive::{LedgerPrimitives, PrimitiveCodecs, PrimitiveSpelling};
use contract_bridge::{BridgeAssembler, BridgeError, ContractSchema, GenError, LedgerData, SchemaNode};

fn contract(datum: Option<SchemaNode>, activity: SchemaNode) -> ContractSchema {
    ContractSchema { name: "Test".into(), datum, activity: Some(activity) }
}

fn text() -> SchemaNode {
    SchemaNode::internal("String")
}

fn role() -> SchemaNode {
    SchemaNode::enumeration(
        "Role",
        vec![SchemaNode::variant("Admin", vec![]), SchemaNode::variant("Member", vec![("name", text())])],
    )
}

fn pair() -> SchemaNode {
    SchemaNode::structure("Pair", vec![("a", text()), ("b", SchemaNode::internal("Int"))])
}

#[test]
fn role_enum_registers_once_and_round_trips() {
    let c = contract(None, role());
    let bridge = BridgeAssembler::default().assemble(&c).unwrap();

    // both variants have at most one field, so neither is registered on its own
    assert_eq!(bridge.types().names(), vec!["Role"]);

    let activity = bridge.activity().unwrap();
    let admin = activity.tag_only("Admin").unwrap();
    let member = activity.construct("Member", &json!("alice")).unwrap();
    assert_eq!(admin, LedgerData::constr(0, vec![]));
    assert_eq!(member, LedgerData::constr(1, vec![LedgerData::Bytes(b"alice".to_vec())]));

    assert_eq!(bridge.decode("Role", &admin).unwrap(), json!({"Admin": {}}));
    assert_eq!(bridge.decode("Role", &member).unwrap(), json!({"Member": "alice"}));
}

#[test]
fn shared_struct_is_registered_once() {
    let outer = SchemaNode::structure("Outer", vec![("p1", pair()), ("p2", pair())]);
    let activity = SchemaNode::enumeration("Act", vec![SchemaNode::variant("Set", vec![("outer", outer)])]);
    let c = contract(None, activity);
    let bridge = BridgeAssembler::default().assemble(&c).unwrap();

    assert_eq!(bridge.types().names(), vec!["Pair", "Outer", "Act"]);
    assert_eq!(bridge.registry().names().filter(|n| *n == "Pair").count(), 1);

    let outer = bridge.types().get("Outer").unwrap();
    let value = json!({"p1": {"a": "x", "b": 1}, "p2": {"a": "y", "b": 2}});
    let encoded = outer.encode(&value).unwrap();
    assert_eq!(outer.decode(&encoded).unwrap(), value);
}

#[test]
fn seeded_forms_encode_identically() {
    let activity = SchemaNode::enumeration(
        "Activity",
        vec![
            SchemaNode::variant("Close", vec![]),
            SchemaNode::variant(
                "CreateRecord",
                vec![("seed", SchemaNode::internal("TxOutputId")), ("label", text())],
            ),
        ],
    );
    let c = contract(None, activity);
    let bridge = BridgeAssembler::default().assemble(&c).unwrap();
    assert_eq!(bridge.types().names(), vec!["Activity$CreateRecord", "Activity"]);

    let seed = json!({"txId": "5e".repeat(32), "index": 1});
    let fields = json!({"label": "first"});
    let activity = bridge.activity().unwrap();

    let direct = activity.seeded("CreateRecord", &seed, &fields).unwrap();
    let deferred = activity.deferred("CreateRecord", &fields).unwrap().fulfill(&seed).unwrap();
    assert_eq!(direct, deferred);

    let mut record = fields.as_object().cloned().unwrap();
    record.insert("seed".into(), seed.clone());
    assert_eq!(bridge.encode_activity("CreateRecord", &serde_json::Value::Object(record)).unwrap(), direct);

    // the constructor carries the seed first, then the remaining fields
    let LedgerData::Constr { tag, fields } = &direct else {
        panic!("expected a constructor, got {direct:?}");
    };
    assert_eq!(*tag, 1);
    assert_eq!(fields.len(), 2);
    assert_eq!(fields[1], LedgerData::Bytes(b"first".to_vec()));
}

#[test]
fn unsupported_kinds_abort_the_whole_pass() {
    let tuple = SchemaNode::Tuple { item_types: vec![SchemaNode::internal("Int")] };
    let datum = SchemaNode::structure(
        "Holder",
        vec![("ok", SchemaNode::internal("Int")), ("deep", SchemaNode::list(SchemaNode::option(tuple)))],
    );
    let c = contract(Some(datum), role());
    let err = BridgeAssembler::default().assemble(&c).unwrap_err();
    assert_eq!(err, GenError::UnsupportedSchemaKind { kind: "tuple".into(), path: "datum.deep[]?".into() });

    let reference = SchemaNode::Reference { id: "__module__m__Elsewhere".into() };
    let activity = SchemaNode::enumeration("Act", vec![SchemaNode::variant("Go", vec![("to", reference)])]);
    let c = contract(None, activity);
    let err = BridgeAssembler::default().assemble(&c).unwrap_err();
    assert_eq!(err, GenError::UnsupportedSchemaKind { kind: "reference".into(), path: "activity.Go.to".into() });
}

#[test]
fn contract_without_activity_is_rejected() {
    let c = ContractSchema { name: "NoActivity".into(), datum: Some(pair()), activity: None };
    assert_eq!(BridgeAssembler::default().assemble(&c).unwrap_err(), GenError::MissingRequiredType("activity"));
}

#[test]
fn datum_surface_follows_the_contract() {
    let without = contract(None, role());
    let bridge = BridgeAssembler::default().assemble(&without).unwrap();
    assert!(bridge.datum().is_none());
    assert!(bridge.encode_datum(&json!({"a": "x", "b": 1})).is_none());

    let with = contract(Some(pair()), role());
    let bridge = BridgeAssembler::default().assemble(&with).unwrap();
    let encoded = bridge.encode_datum(&json!({"a": "x", "b": "7"})).unwrap().unwrap();
    assert_eq!(encoded, LedgerData::List(vec![LedgerData::Bytes(b"x".to_vec()), LedgerData::Int(7)]));
    assert_eq!(bridge.types().names(), vec!["Pair", "Role"]);
}

#[test]
fn auxiliary_types_are_constructible_on_their_own() {
    let status = SchemaNode::enumeration(
        "Status",
        vec![SchemaNode::variant("Idle", vec![]), SchemaNode::variant("Busy", vec![("job", text())])],
    );
    let activity = SchemaNode::enumeration("Act", vec![SchemaNode::variant("Report", vec![("status", status)])]);
    let c = contract(None, activity);
    let bridge = BridgeAssembler::default().assemble(&c).unwrap();

    let status = bridge.types().get("Status").unwrap().variants().unwrap();
    assert_eq!(status.tag_only("Idle").unwrap(), LedgerData::constr(0, vec![]));
    assert_eq!(
        status.construct("Busy", &json!("sync")).unwrap(),
        LedgerData::constr(1, vec![LedgerData::Bytes(b"sync".to_vec())])
    );

    assert!(bridge.types().get("Nope").is_none());
    assert_eq!(
        bridge.decode("Nope", &LedgerData::Int(0)).unwrap_err(),
        BridgeError::UnknownType("Nope".into())
    );
    let act = bridge.types().get("Act").unwrap();
    assert_eq!(act.name(), Some("Act"));
}

#[test]
fn contracts_load_from_json() {
    let src = r#"{
        "name": "Roles",
        "activity": {
            "kind": "enum",
            "name": "Role",
            "variantTypes": [
                {"kind": "variant", "name": "Admin", "fieldTypes": []},
                {"kind": "variant", "name": "Member", "fieldTypes": [
                    {"name": "name", "type": {"kind": "internal", "name": "String"}}
                ]}
            ]
        }
    }"#;
    let c = ContractSchema::from_json_str(src).unwrap();
    assert_eq!(c.activity, Some(role()));
    assert!(c.datum.is_none());

    let err = ContractSchema::from_json_str(r#"{"name": "X", "activity": {"kind": "struct", "name": 3}}"#)
        .unwrap_err();
    assert!(err.to_string().starts_with("at JSON path activity"), "{err}");
}

/// Ledger primitives plus a `Money` leaf written as `"<units>.<cents>"`.
struct WithMoney;

impl PrimitiveCodecs for WithMoney {
    fn spelling(&self, name: &str) -> Option<PrimitiveSpelling> {
        match name {
            "Money" => Some(PrimitiveSpelling { canonical: "Money".into(), permissive: "MoneyLike".into() }),
            other => LedgerPrimitives.spelling(other),
        }
    }

    fn encode(&self, name: &str, value: &Value, path: &str) -> BridgeResult<LedgerData> {
        if name != "Money" {
            return LedgerPrimitives.encode(name, value, path);
        }
        let cents = value
            .as_str()
            .and_then(|s| s.split_once('.'))
            .filter(|(_, cents)| cents.len() == 2)
            .and_then(|(units, cents)| Some(units.parse::<i128>().ok()? * 100 + cents.parse::<i128>().ok()?));
        cents
            .map(LedgerData::Int)
            .ok_or_else(|| BridgeError::InvalidValue { path: path.into(), reason: "expected money".into() })
    }

    fn decode(&self, name: &str, data: &LedgerData, path: &str) -> BridgeResult<Value> {
        match (name, data) {
            ("Money", LedgerData::Int(cents)) => Ok(json!(format!("{}.{:02}", cents / 100, cents % 100))),
            _ => LedgerPrimitives.decode(name, data, path),
        }
    }
}

fn payments() -> SchemaNode {
    SchemaNode::enumeration(
        "Payment",
        vec![
            SchemaNode::variant("Cancel", vec![]),
            SchemaNode::variant("Pay", vec![("amount", SchemaNode::internal("Money"))]),
        ],
    )
}

#[test]
fn custom_primitive_codecs_plug_in() {
    let c = contract(None, payments());
    let err = BridgeAssembler::default().assemble(&c).unwrap_err();
    assert_eq!(err, GenError::UnknownPrimitive { name: "Money".into(), path: "activity.Pay.amount".into() });

    let bridge = BridgeAssembler::default().with_primitives(WithMoney).assemble(&c).unwrap();
    let pay = bridge.encode_activity("Pay", &json!("12.34")).unwrap();
    assert_eq!(pay, LedgerData::constr(1, vec![LedgerData::Int(1234)]));
    assert_eq!(bridge.decode_activity(&pay).unwrap(), json!({"Pay": "12.34"}));
    assert!(bridge.emit().contains("{ Pay: MoneyLike }"));

    let err = bridge.encode_activity("Pay", &json!(12)).unwrap_err();
    assert_eq!(err, BridgeError::InvalidValue { path: "activity.Pay.amount".into(), reason: "expected money".into() });
}

#[test]
fn decode_activity_reads_every_variant() {
    let c = contract(None, role());
    let bridge = BridgeAssembler::default().assemble(&c).unwrap();
    let admin = bridge.encode_activity("Admin", &Value::Null).unwrap();
    let member = bridge.encode_activity("Member", &json!("bob")).unwrap();
    assert_eq!(bridge.decode_activity(&admin).unwrap(), json!({"Admin": {}}));
    assert_eq!(bridge.decode_activity(&member).unwrap(), json!({"Member": "bob"}));

    let err = bridge.decode_activity(&LedgerData::constr(5, vec![])).unwrap_err();
    assert!(matches!(&err, BridgeError::Decode { path, .. } if path == "activity"), "{err:?}");
}
