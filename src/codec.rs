//! Schema-directed value codec.
//!
//! Encodes permissive JSON values into [`LedgerData`] and decodes ledger data into
//! canonical JSON values. Leaves go through the primitive codec provider.
use serde_json::{Map, Value};

use crate::data::LedgerData;
use crate::describe::TypeDescriptor;
use crate::error::{BridgeError, BridgeResult};
use crate::primitive::PrimitiveCodecs;
use crate::schema::{EnumSchema, FieldSchema, SchemaNode, VariantSchema};

pub struct ValueCodec<'p> {
    primitives: &'p dyn PrimitiveCodecs,
}

const SOME_TAG: u64 = 0;
const NONE_TAG: u64 = 1;

impl<'p> ValueCodec<'p> {
    pub fn new(primitives: &'p dyn PrimitiveCodecs) -> Self {
        Self { primitives }
    }

    // -------------------------------- encode -------------------------------- //

    pub fn encode(&self, node: &SchemaNode, value: &Value, path: &str) -> BridgeResult<LedgerData> {
        match node {
            SchemaNode::Internal { name } => self.primitives.encode(name, value, path),
            SchemaNode::List { item_type } => {
                let items = value
                    .as_array()
                    .ok_or_else(|| BridgeError::invalid(path, "expected an array"))?;
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.encode(item_type, item, &format!("{path}[{i}]")))
                    .collect::<BridgeResult<Vec<_>>>()
                    .map(LedgerData::List)
            }
            SchemaNode::Map { key_type, value_type } => self.encode_map(key_type, value_type, value, path),
            SchemaNode::Option { some_type } => match value {
                Value::Null => Ok(LedgerData::constr(NONE_TAG, Vec::new())),
                some => Ok(LedgerData::constr(SOME_TAG, vec![self.encode(some_type, some, path)?])),
            },
            SchemaNode::Struct(s) => self.encode_struct_fields(&s.field_types, value, path),
            SchemaNode::Enum(e) => {
                let (variant, tag, payload) = self.select_variant(e, value, path)?;
                let fields = self.encode_variant_fields(variant, payload, &format!("{path}.{}", variant.name))?;
                Ok(LedgerData::constr(tag, fields))
            }
            SchemaNode::Variant(v) => self.encode_variant(v, v.tag.unwrap_or(0), value, path),
            SchemaNode::Tuple { .. } | SchemaNode::Reference { .. } => Err(BridgeError::invalid(
                path,
                format!("{} schemas cannot be encoded", node.kind()),
            )),
        }
    }

    /// Encode a value of a described type. Registered variants carry the tag of
    /// their position in the parent enum.
    pub fn encode_described(
        &self,
        descriptor: &TypeDescriptor<'_>,
        value: &Value,
        path: &str,
    ) -> BridgeResult<LedgerData> {
        match (descriptor.type_schema, descriptor.variant_tag) {
            (SchemaNode::Variant(v), Some(tag)) => self.encode_variant(v, tag, value, path),
            (node, _) => self.encode(node, value, path),
        }
    }

    fn encode_variant(&self, v: &VariantSchema, tag: u64, value: &Value, path: &str) -> BridgeResult<LedgerData> {
        let fields = self.encode_variant_fields(v, Some(value), path)?;
        Ok(LedgerData::constr(tag, fields))
    }

    /// Struct layout: unwrapped single field, list of fields otherwise.
    fn encode_struct_fields(&self, fields: &[FieldSchema], value: &Value, path: &str) -> BridgeResult<LedgerData> {
        if let [only] = fields {
            return self.encode(&only.ty, value, &format!("{path}.{}", only.name));
        }
        self.encode_field_list(fields, value, path).map(LedgerData::List)
    }

    /// Encode the fields of a variant, as the constructor's field list.
    pub fn encode_variant_fields(
        &self,
        variant: &VariantSchema,
        payload: Option<&Value>,
        path: &str,
    ) -> BridgeResult<Vec<LedgerData>> {
        match (variant.field_types.as_slice(), payload) {
            ([], None) => Ok(Vec::new()),
            ([only], Some(value)) => Ok(vec![self.encode(&only.ty, value, &format!("{path}.{}", only.name))?]),
            ([_], None) => Err(BridgeError::invalid(path, format!("variant `{}` needs a value", variant.name))),
            (fields, Some(value)) => self.encode_field_list(fields, value, path),
            (_, None) => Err(BridgeError::invalid(path, format!("variant `{}` needs its fields", variant.name))),
        }
    }

    /// Encode fields from a record (or an array in field order). An empty field
    /// list accepts `{}` or `null`.
    pub fn encode_field_list(&self, fields: &[FieldSchema], value: &Value, path: &str) -> BridgeResult<Vec<LedgerData>> {
        match value {
            Value::Null if fields.is_empty() => Ok(Vec::new()),
            Value::Object(map) => {
                if let Some(extra) = map.keys().find(|k| !fields.iter().any(|f| &f.name == *k)) {
                    return Err(BridgeError::invalid(path, format!("unknown field `{extra}`")));
                }
                fields
                    .iter()
                    .map(|f| {
                        let field_path = format!("{path}.{}", f.name);
                        let v = map
                            .get(&f.name)
                            .ok_or_else(|| BridgeError::invalid(&field_path, "missing field"))?;
                        self.encode(&f.ty, v, &field_path)
                    })
                    .collect()
            }
            Value::Array(items) if items.len() == fields.len() => fields
                .iter()
                .zip(items)
                .map(|(f, v)| self.encode(&f.ty, v, &format!("{path}.{}", f.name)))
                .collect(),
            _ => Err(BridgeError::invalid(
                path,
                format!("expected a record of {} field(s)", fields.len()),
            )),
        }
    }

    fn encode_map(
        &self,
        key_type: &SchemaNode,
        value_type: &SchemaNode,
        value: &Value,
        path: &str,
    ) -> BridgeResult<LedgerData> {
        let mut entries = Vec::new();
        match value {
            Value::Array(pairs) => {
                for (i, pair) in pairs.iter().enumerate() {
                    let entry_path = format!("{path}[{i}]");
                    let [k, v] = pair.as_array().map(Vec::as_slice).unwrap_or_default() else {
                        return Err(BridgeError::invalid(&entry_path, "expected a [key, value] pair"));
                    };
                    entries.push((self.encode(key_type, k, &entry_path)?, self.encode(value_type, v, &entry_path)?));
                }
            }
            Value::Object(map) => {
                for (k, v) in map {
                    let entry_path = format!("{path}.{k}");
                    let key = self.encode(key_type, &Value::String(k.clone()), &entry_path)?;
                    entries.push((key, self.encode(value_type, v, &entry_path)?));
                }
            }
            _ => return Err(BridgeError::invalid(path, "expected a map")),
        }
        Ok(LedgerData::Map(entries))
    }

    /// Resolve a permissive enum value: `"Variant"` or `{"Variant": payload}`.
    pub fn select_variant<'e, 'v>(
        &self,
        e: &'e EnumSchema,
        value: &'v Value,
        path: &str,
    ) -> BridgeResult<(&'e VariantSchema, u64, Option<&'v Value>)> {
        let (name, payload) = match value {
            Value::String(name) => (name.as_str(), None),
            Value::Object(map) if map.len() == 1 => {
                let (name, payload) = map.iter().next().ok_or_else(|| BridgeError::invalid(path, "empty enum value"))?;
                (name.as_str(), Some(payload))
            }
            _ => {
                return Err(BridgeError::invalid(
                    path,
                    format!("expected a `{}` variant as \"Name\" or {{\"Name\": ...}}", e.name),
                ));
            }
        };
        let (variant, tag) = find_variant(e, name).ok_or_else(|| {
            BridgeError::invalid(path, format!("`{}` has no variant `{name}`", e.name))
        })?;
        // `{"Tag": {}}` and `{"Tag": null}` mean the same as `"Tag"`
        let payload = match payload {
            Some(Value::Null) if variant.field_types.is_empty() => None,
            Some(Value::Object(m)) if m.is_empty() && variant.field_types.is_empty() => None,
            other => other,
        };
        Ok((variant, tag, payload))
    }

    // -------------------------------- decode -------------------------------- //

    pub fn decode(&self, node: &SchemaNode, data: &LedgerData, path: &str) -> BridgeResult<Value> {
        match (node, data) {
            (SchemaNode::Internal { name }, data) => self.primitives.decode(name, data, path),
            (SchemaNode::List { item_type }, LedgerData::List(items)) => items
                .iter()
                .enumerate()
                .map(|(i, item)| self.decode(item_type, item, &format!("{path}[{i}]")))
                .collect::<BridgeResult<Vec<_>>>()
                .map(Value::Array),
            (SchemaNode::Map { key_type, value_type }, LedgerData::Map(entries)) => entries
                .iter()
                .enumerate()
                .map(|(i, (k, v))| {
                    let entry_path = format!("{path}[{i}]");
                    Ok(Value::Array(vec![
                        self.decode(key_type, k, &entry_path)?,
                        self.decode(value_type, v, &entry_path)?,
                    ]))
                })
                .collect::<BridgeResult<Vec<_>>>()
                .map(Value::Array),
            (SchemaNode::Option { some_type }, LedgerData::Constr { tag, fields }) => {
                match (*tag, fields.as_slice()) {
                    (SOME_TAG, [some]) => self.decode(some_type, some, path),
                    (NONE_TAG, []) => Ok(Value::Null),
                    _ => Err(BridgeError::decode(path, "malformed option")),
                }
            }
            (SchemaNode::Struct(s), data) => match s.field_types.as_slice() {
                [only] => self.decode(&only.ty, data, &format!("{path}.{}", only.name)),
                fields => match data {
                    LedgerData::List(items) => self.decode_field_list(fields, items, path),
                    other => Err(BridgeError::decode(path, format!("struct from {}", other.label()))),
                },
            },
            (SchemaNode::Enum(e), LedgerData::Constr { tag, fields }) => {
                let variant = e
                    .variant_types
                    .iter()
                    .enumerate()
                    .find_map(|(ix, node)| match node {
                        SchemaNode::Variant(v) if v.tag.unwrap_or(ix as u64) == *tag => Some(v),
                        _ => None,
                    })
                    .ok_or_else(|| BridgeError::decode(path, format!("`{}` has no tag {tag}", e.name)))?;
                let payload = self.decode_variant_fields(variant, fields, &format!("{path}.{}", variant.name))?;
                let mut out = Map::new();
                out.insert(variant.name.clone(), payload);
                Ok(Value::Object(out))
            }
            (SchemaNode::Variant(v), data) => self.decode_variant(v, v.tag.unwrap_or(0), data, path),
            (node, data) => Err(BridgeError::decode(
                path,
                format!("{} schema cannot be read from {}", node.kind(), data.label()),
            )),
        }
    }

    pub fn decode_described(
        &self,
        descriptor: &TypeDescriptor<'_>,
        data: &LedgerData,
        path: &str,
    ) -> BridgeResult<Value> {
        match (descriptor.type_schema, descriptor.variant_tag) {
            (SchemaNode::Variant(v), Some(tag)) => self.decode_variant(v, tag, data, path),
            (node, _) => self.decode(node, data, path),
        }
    }

    fn decode_variant(&self, v: &VariantSchema, expected: u64, data: &LedgerData, path: &str) -> BridgeResult<Value> {
        match data {
            LedgerData::Constr { tag, fields } if *tag == expected => self.decode_variant_fields(v, fields, path),
            LedgerData::Constr { tag, .. } => Err(BridgeError::decode(
                path,
                format!("variant `{}` has tag {expected}, found {tag}", v.name),
            )),
            other => Err(BridgeError::decode(path, format!("variant from {}", other.label()))),
        }
    }

    fn decode_variant_fields(&self, variant: &VariantSchema, fields: &[LedgerData], path: &str) -> BridgeResult<Value> {
        match (variant.field_types.as_slice(), fields) {
            ([only], [data]) => self.decode(&only.ty, data, &format!("{path}.{}", only.name)),
            (schema, _) if schema.len() != 1 => self.decode_field_list(schema, fields, path),
            _ => Err(BridgeError::decode(path, format!("variant `{}` field count mismatch", variant.name))),
        }
    }

    fn decode_field_list(&self, schema: &[FieldSchema], items: &[LedgerData], path: &str) -> BridgeResult<Value> {
        if schema.len() != items.len() {
            return Err(BridgeError::decode(
                path,
                format!("expected {} field(s), found {}", schema.len(), items.len()),
            ));
        }
        let mut out = Map::new();
        for (field, item) in schema.iter().zip(items) {
            let value = self.decode(&field.ty, item, &format!("{path}.{}", field.name))?;
            out.insert(field.name.clone(), value);
        }
        Ok(Value::Object(out))
    }
}

pub fn find_variant<'e>(e: &'e EnumSchema, name: &str) -> Option<(&'e VariantSchema, u64)> {
    e.variant_types.iter().enumerate().find_map(|(ix, node)| match node {
        SchemaNode::Variant(v) if v.name == name => Some((v, v.tag.unwrap_or(ix as u64))),
        _ => None,
    })
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
