//! Primitive codec provider: spellings and leaf encodings for `internal` schema nodes.
use serde_json::{Number, Value};

use crate::data::LedgerData;
use crate::error::{BridgeError, BridgeResult};

/// Canonical and permissive spellings of one primitive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimitiveSpelling {
    pub canonical: String,
    pub permissive: String,
}

/// Collaborator that owns primitive leaves.
///
/// `spelling` returning `None` means the primitive is unknown and generation fails.
pub trait PrimitiveCodecs {
    fn spelling(&self, name: &str) -> Option<PrimitiveSpelling>;
    fn encode(&self, name: &str, value: &Value, path: &str) -> BridgeResult<LedgerData>;
    fn decode(&self, name: &str, data: &LedgerData, path: &str) -> BridgeResult<Value>;
}

/// The default ledger primitive set.
#[derive(Debug, Clone, Copy, Default)]
pub struct LedgerPrimitives;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Primitive {
    Int,
    Real,
    Bool,
    Text,
    ByteArray,
    Hash28,
    TxId,
    TxOutputId,
    Time,
    Duration,
    Data,
}

/// Fixed-point scale of `Real`.
const REAL_SCALE: f64 = 1_000_000.0;
/// Largest scaled `Real` that survives the trip through `f64` exactly (2^53).
const MAX_SCALED_REAL: i128 = 1 << 53;

impl Primitive {
    fn from_name(name: &str) -> Option<Self> {
        let p = match name {
            "Int" => Self::Int,
            "Real" => Self::Real,
            "Bool" => Self::Bool,
            "String" => Self::Text,
            "ByteArray" => Self::ByteArray,
            "PubKeyHash" | "ValidatorHash" | "MintingPolicyHash" => Self::Hash28,
            "TxId" => Self::TxId,
            "TxOutputId" => Self::TxOutputId,
            "Time" => Self::Time,
            "Duration" => Self::Duration,
            "Data" => Self::Data,
            _ => return None,
        };
        Some(p)
    }
}

impl PrimitiveCodecs for LedgerPrimitives {
    fn spelling(&self, name: &str) -> Option<PrimitiveSpelling> {
        let (canonical, permissive) = match Primitive::from_name(name)? {
            Primitive::Int => ("Int", "IntLike"),
            Primitive::Real => ("Real", "RealLike"),
            Primitive::Bool => ("Bool", "Bool"),
            Primitive::Text => ("Text", "Text"),
            Primitive::ByteArray => ("Bytes", "BytesLike"),
            Primitive::Hash28 | Primitive::TxId | Primitive::TxOutputId => {
                return Some(PrimitiveSpelling {
                    canonical: name.to_string(),
                    permissive: format!("{name}Like"),
                });
            }
            Primitive::Time => ("Time", "TimeLike"),
            Primitive::Duration => ("Duration", "IntLike"),
            Primitive::Data => ("Data", "Data"),
        };
        Some(PrimitiveSpelling { canonical: canonical.into(), permissive: permissive.into() })
    }

    fn encode(&self, name: &str, value: &Value, path: &str) -> BridgeResult<LedgerData> {
        let prim = Primitive::from_name(name)
            .ok_or_else(|| BridgeError::invalid(path, format!("unknown primitive `{name}`")))?;
        match prim {
            Primitive::Int | Primitive::Time | Primitive::Duration => {
                int_from_value(value, path).map(LedgerData::Int)
            }
            Primitive::Real => {
                let x = match value {
                    Value::Number(n) => n.as_f64(),
                    Value::String(s) => s.trim().parse::<f64>().ok(),
                    _ => None,
                }
                .filter(|x| x.is_finite())
                .ok_or_else(|| BridgeError::invalid(path, "expected a real number"))?;
                let scaled = (x * REAL_SCALE).round();
                if scaled.abs() > MAX_SCALED_REAL as f64 {
                    return Err(BridgeError::invalid(path, format!("real {x} is out of range")));
                }
                Ok(LedgerData::Int(scaled as i128))
            }
            Primitive::Bool => match value {
                Value::Bool(b) => Ok(LedgerData::constr(u64::from(*b), Vec::new())),
                _ => Err(BridgeError::invalid(path, "expected a boolean")),
            },
            Primitive::Text => match value {
                Value::String(s) => Ok(LedgerData::Bytes(s.as_bytes().to_vec())),
                _ => Err(BridgeError::invalid(path, "expected a string")),
            },
            Primitive::ByteArray => bytes_from_value(value, None, path).map(LedgerData::Bytes),
            Primitive::Hash28 => bytes_from_value(value, Some(28), path).map(LedgerData::Bytes),
            Primitive::TxId => {
                let id = bytes_from_value(value, Some(32), path)?;
                Ok(LedgerData::constr(0, vec![LedgerData::Bytes(id)]))
            }
            Primitive::TxOutputId => tx_output_id_from_value(value, path),
            Primitive::Data => serde_json::from_value::<LedgerData>(value.clone())
                .map_err(|e| BridgeError::invalid(path, e.to_string())),
        }
    }

    fn decode(&self, name: &str, data: &LedgerData, path: &str) -> BridgeResult<Value> {
        let prim = Primitive::from_name(name)
            .ok_or_else(|| BridgeError::decode(path, format!("unknown primitive `{name}`")))?;
        match (prim, data) {
            (Primitive::Int | Primitive::Time | Primitive::Duration, LedgerData::Int(i)) => {
                Ok(int_to_value(*i))
            }
            (Primitive::Real, LedgerData::Int(i)) if i.unsigned_abs() <= MAX_SCALED_REAL as u128 => {
                Number::from_f64(*i as f64 / REAL_SCALE)
                    .map(Value::Number)
                    .ok_or_else(|| BridgeError::decode(path, "real out of range"))
            }
            (Primitive::Real, LedgerData::Int(i)) => {
                Err(BridgeError::decode(path, format!("scaled real {i} is out of range")))
            }
            (Primitive::Bool, LedgerData::Constr { tag, fields }) if fields.is_empty() => match tag {
                0 => Ok(Value::Bool(false)),
                1 => Ok(Value::Bool(true)),
                _ => Err(BridgeError::decode(path, format!("bool tag {tag}"))),
            },
            (Primitive::Text, LedgerData::Bytes(b)) => String::from_utf8(b.clone())
                .map(Value::String)
                .map_err(|e| BridgeError::decode(path, e.to_string())),
            (Primitive::ByteArray | Primitive::Hash28, LedgerData::Bytes(b)) => {
                Ok(Value::String(hex::encode(b)))
            }
            (Primitive::TxId, LedgerData::Constr { tag: 0, fields }) => match fields.as_slice() {
                [LedgerData::Bytes(b)] => Ok(Value::String(hex::encode(b))),
                _ => Err(BridgeError::decode(path, "malformed TxId")),
            },
            (Primitive::TxOutputId, LedgerData::Constr { tag: 0, fields }) => {
                match fields.as_slice() {
                    [tx_id, LedgerData::Int(index)] => {
                        let tx_id = self.decode("TxId", tx_id, path)?;
                        let mut out = serde_json::Map::new();
                        out.insert("txId".into(), tx_id);
                        out.insert("index".into(), int_to_value(*index));
                        Ok(Value::Object(out))
                    }
                    _ => Err(BridgeError::decode(path, "malformed TxOutputId")),
                }
            }
            (Primitive::Data, data) => serde_json::to_value(data)
                .map_err(|e| BridgeError::decode(path, e.to_string())),
            (_, other) => Err(BridgeError::decode(
                path,
                format!("`{name}` cannot be read from {}", other.label()),
            )),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn int_from_value(value: &Value, path: &str) -> BridgeResult<i128> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from))
            .ok_or_else(|| BridgeError::invalid(path, format!("{n} is not an integer"))),
        Value::String(s) => s
            .trim()
            .parse::<i128>()
            .map_err(|_| BridgeError::invalid(path, format!("`{s}` is not an integer"))),
        _ => Err(BridgeError::invalid(path, "expected an integer")),
    }
}

fn int_to_value(i: i128) -> Value {
    match i64::try_from(i) {
        Ok(small) => Value::from(small),
        Err(_) => Value::String(i.to_string()),
    }
}

fn bytes_from_value(value: &Value, len: Option<usize>, path: &str) -> BridgeResult<Vec<u8>> {
    let bytes = match value {
        Value::String(s) => {
            hex::decode(s).map_err(|e| BridgeError::invalid(path, format!("bad hex: {e}")))?
        }
        Value::Array(xs) => xs
            .iter()
            .map(|x| {
                x.as_u64()
                    .and_then(|b| u8::try_from(b).ok())
                    .ok_or_else(|| BridgeError::invalid(path, "byte array items must be 0..=255"))
            })
            .collect::<BridgeResult<Vec<u8>>>()?,
        _ => return Err(BridgeError::invalid(path, "expected hex string or byte array")),
    };
    match len {
        Some(n) if bytes.len() != n => Err(BridgeError::invalid(
            path,
            format!("expected {n} bytes, got {}", bytes.len()),
        )),
        _ => Ok(bytes),
    }
}

fn tx_output_id_from_value(value: &Value, path: &str) -> BridgeResult<LedgerData> {
    let (tx_id, index) = match value {
        Value::String(s) => {
            let (id, ix) = s
                .split_once('#')
                .ok_or_else(|| BridgeError::invalid(path, "expected `<txId>#<index>`"))?;
            (Value::String(id.to_string()), Value::String(ix.to_string()))
        }
        Value::Object(map) => {
            let id = map
                .get("txId")
                .ok_or_else(|| BridgeError::invalid(path, "missing `txId`"))?;
            let ix = map
                .get("index")
                .ok_or_else(|| BridgeError::invalid(path, "missing `index`"))?;
            (id.clone(), ix.clone())
        }
        _ => return Err(BridgeError::invalid(path, "expected a TxOutputId")),
    };
    let id = bytes_from_value(&tx_id, Some(32), path)?;
    let index = int_from_value(&index, path)?;
    Ok(LedgerData::constr(
        0,
        vec![LedgerData::constr(0, vec![LedgerData::Bytes(id)]), LedgerData::Int(index)],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn int_accepts_numbers_and_strings() {
        let p = LedgerPrimitives;
        assert_eq!(p.encode("Int", &json!(42), "$").unwrap(), LedgerData::Int(42));
        assert_eq!(p.encode("Int", &json!("-7"), "$").unwrap(), LedgerData::Int(-7));
        assert!(p.encode("Int", &json!(1.5), "$").is_err());
        let big = LedgerData::Int(i128::from(i64::MAX) + 1);
        assert_eq!(p.decode("Int", &big, "$").unwrap(), json!("9223372036854775808"));
    }

    #[test]
    fn tx_output_id_forms_agree() {
        let p = LedgerPrimitives;
        let hex_id = "ab".repeat(32);
        let a = p.encode("TxOutputId", &json!(format!("{hex_id}#3")), "$").unwrap();
        let b = p.encode("TxOutputId", &json!({"txId": hex_id, "index": 3}), "$").unwrap();
        assert_eq!(a, b);
        assert_eq!(p.decode("TxOutputId", &a, "$").unwrap(), json!({"txId": hex_id, "index": 3}));
    }

    #[test]
    fn hashes_check_length() {
        let p = LedgerPrimitives;
        let err = p.encode("PubKeyHash", &json!("abcd"), "$.owner").unwrap_err();
        assert!(matches!(err, BridgeError::InvalidValue { ref path, .. } if path == "$.owner"));
    }

    #[test]
    fn real_is_fixed_point() {
        let p = LedgerPrimitives;
        assert_eq!(p.encode("Real", &json!(1.5), "$").unwrap(), LedgerData::Int(1_500_000));
        assert_eq!(p.encode("Real", &json!("-0.000001"), "$").unwrap(), LedgerData::Int(-1));
        assert_eq!(p.decode("Real", &LedgerData::Int(2_250_000), "$").unwrap(), json!(2.25));
        assert!(p.encode("Real", &json!("NaN"), "$").is_err());
    }

    #[test]
    fn real_out_of_range_is_rejected() {
        let p = LedgerPrimitives;
        for big in [json!(1e40), json!(1e50), json!(-1e40), json!(1e10)] {
            let err = p.encode("Real", &big, "$.x").unwrap_err();
            assert!(matches!(err, BridgeError::InvalidValue { ref path, .. } if path == "$.x"), "{err:?}");
        }
        // the largest accepted magnitude still decodes
        let edge = LedgerData::Int(MAX_SCALED_REAL);
        assert!(p.decode("Real", &edge, "$").is_ok());
        let err = p.decode("Real", &LedgerData::Int(MAX_SCALED_REAL + 1), "$").unwrap_err();
        assert!(matches!(err, BridgeError::Decode { .. }));
        assert!(p.decode("Real", &LedgerData::Int(i128::MIN), "$").is_err());
    }

    #[test]
    fn duration_and_data_pass_through() {
        let p = LedgerPrimitives;
        assert_eq!(p.encode("Duration", &json!("3600000"), "$").unwrap(), LedgerData::Int(3_600_000));
        assert_eq!(p.decode("Duration", &LedgerData::Int(60), "$").unwrap(), json!(60));

        let data = LedgerData::constr(2, vec![LedgerData::Int(1), LedgerData::Bytes(vec![0xca, 0xfe])]);
        let as_json = p.decode("Data", &data, "$").unwrap();
        assert_eq!(p.encode("Data", &as_json, "$").unwrap(), data);
    }

    #[test]
    fn tx_id_is_wrapped_bytes() {
        let p = LedgerPrimitives;
        let hex_id = "0f".repeat(32);
        let encoded = p.encode("TxId", &json!(hex_id), "$").unwrap();
        assert_eq!(encoded, LedgerData::constr(0, vec![LedgerData::Bytes(vec![0x0f; 32])]));
        assert_eq!(p.decode("TxId", &encoded, "$").unwrap(), json!(hex_id));
        assert!(p.encode("TxId", &json!("0f0f"), "$").is_err());
    }

    #[test]
    fn unknown_primitive_has_no_spelling() {
        assert!(LedgerPrimitives.spelling("Widget").is_none());
        assert_eq!(LedgerPrimitives.spelling("String").unwrap().canonical, "Text");
    }
}
