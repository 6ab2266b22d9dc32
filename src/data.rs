//! Structural model of the external ledger-data encoding.
//!
//! The byte layout belongs to the ledger SDK; the generator only needs the shape.
use serde::{Deserialize, Serialize};

/// An encoded value, as handed to transaction-building code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LedgerData {
    Int(i128),
    Bytes(#[serde(with = "hex_bytes")] Vec<u8>),
    List(Vec<LedgerData>),
    Map(Vec<(LedgerData, LedgerData)>),
    Constr { tag: u64, fields: Vec<LedgerData> },
}

pub type EncodedValue = LedgerData;

impl LedgerData {
    pub fn constr(tag: u64, fields: Vec<LedgerData>) -> Self {
        Self::Constr { tag, fields }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::Constr { .. } => "constr",
        }
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(d)?;
        hex::decode(&raw).map_err(serde::de::Error::custom)
    }
}
