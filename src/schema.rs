//! Schema Node input model.
//!
//! These nodes describe a contract's on-chain data types as produced by the
//! external contract compiler. They are read-only inputs to generation; the same
//! named struct or enum may be reachable from many parents.
use std::fmt;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::LoadError;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SchemaNode {
    /// Primitive leaf, resolved by the primitive codec provider.
    Internal { name: String },
    List {
        #[serde(rename = "itemType")]
        item_type: Box<SchemaNode>,
    },
    Map {
        #[serde(rename = "keyType")]
        key_type: Box<SchemaNode>,
        #[serde(rename = "valueType")]
        value_type: Box<SchemaNode>,
    },
    Option {
        #[serde(rename = "someType")]
        some_type: Box<SchemaNode>,
    },
    /// Loaded but never generated.
    Tuple {
        #[serde(rename = "itemTypes", default)]
        item_types: Vec<SchemaNode>,
    },
    /// Loaded but never generated.
    Reference { id: String },
    Struct(StructSchema),
    Enum(EnumSchema),
    Variant(VariantSchema),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructSchema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "fieldTypes", default)]
    pub field_types: Vec<FieldSchema>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumSchema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Every member is expected to be a [`SchemaNode::Variant`].
    #[serde(rename = "variantTypes", default)]
    pub variant_types: Vec<SchemaNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantSchema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Constructor index; defaults to the variant's position in its enum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<u64>,
    #[serde(rename = "fieldTypes", default)]
    pub field_types: Vec<FieldSchema>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: SchemaNode,
}

/// The closed set of schema kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    Internal,
    List,
    Map,
    Option,
    Tuple,
    Reference,
    Struct,
    Enum,
    Variant,
}

/// A contract's two distinguished entry types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractSchema {
    pub name: String,
    /// Storage type; a contract without one is valid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datum: Option<SchemaNode>,
    /// Required at assembly time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity: Option<SchemaNode>,
}

/// Components recovered from a structured schema id such as
/// `__module__vault__Activity[]__Deposit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaId {
    pub module: String,
    pub type_name: String,
    pub variant: Option<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

static SCHEMA_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^__module__([A-Za-z0-9_]+?)__([A-Za-z0-9_]+?)(?:\[\]__([A-Za-z0-9_]+))?$")
        .expect("schema id pattern is valid")
});

impl SchemaId {
    pub fn parse(raw: &str) -> Option<Self> {
        let caps = SCHEMA_ID.captures(raw)?;
        Some(Self {
            module: caps[1].to_string(),
            type_name: caps[2].to_string(),
            variant: caps.get(3).map(|m| m.as_str().to_string()),
        })
    }
}

impl SchemaNode {
    pub fn kind(&self) -> SchemaKind {
        match self {
            Self::Internal { .. } => SchemaKind::Internal,
            Self::List { .. } => SchemaKind::List,
            Self::Map { .. } => SchemaKind::Map,
            Self::Option { .. } => SchemaKind::Option,
            Self::Tuple { .. } => SchemaKind::Tuple,
            Self::Reference { .. } => SchemaKind::Reference,
            Self::Struct(_) => SchemaKind::Struct,
            Self::Enum(_) => SchemaKind::Enum,
            Self::Variant(_) => SchemaKind::Variant,
        }
    }

    /// Declared name; only structs, enums and variants carry one.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Struct(s) => Some(&s.name),
            Self::Enum(e) => Some(&e.name),
            Self::Variant(v) => Some(&v.name),
            _ => None,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Struct(s) => s.id.as_deref(),
            Self::Enum(e) => e.id.as_deref(),
            Self::Variant(v) => v.id.as_deref(),
            Self::Reference { id } => Some(id),
            _ => None,
        }
    }

    /// Defining module, when the id is structured.
    pub fn module(&self) -> Option<String> {
        self.id().and_then(SchemaId::parse).map(|id| id.module)
    }

    pub fn as_enum(&self) -> Option<&EnumSchema> {
        match self {
            Self::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_enum(&self) -> bool {
        matches!(self, Self::Enum(_))
    }

    // Convenience constructors, mostly for fixtures and tests.

    pub fn internal(name: &str) -> Self {
        Self::Internal { name: name.to_string() }
    }

    pub fn list(item: SchemaNode) -> Self {
        Self::List { item_type: Box::new(item) }
    }

    pub fn map(key: SchemaNode, value: SchemaNode) -> Self {
        Self::Map { key_type: Box::new(key), value_type: Box::new(value) }
    }

    pub fn option(some: SchemaNode) -> Self {
        Self::Option { some_type: Box::new(some) }
    }

    pub fn structure(name: &str, fields: Vec<(&str, SchemaNode)>) -> Self {
        Self::Struct(StructSchema {
            name: name.to_string(),
            id: None,
            field_types: FieldSchema::many(fields),
        })
    }

    pub fn enumeration(name: &str, variants: Vec<SchemaNode>) -> Self {
        Self::Enum(EnumSchema { name: name.to_string(), id: None, variant_types: variants })
    }

    pub fn variant(name: &str, fields: Vec<(&str, SchemaNode)>) -> Self {
        Self::Variant(VariantSchema {
            name: name.to_string(),
            id: None,
            tag: None,
            field_types: FieldSchema::many(fields),
        })
    }
}

impl VariantSchema {
    /// Parent enum name recovered from the structured id.
    pub fn parent_from_id(&self) -> Option<String> {
        let id = SchemaId::parse(self.id.as_deref()?)?;
        id.variant.is_some().then_some(id.type_name)
    }
}

impl FieldSchema {
    fn many(fields: Vec<(&str, SchemaNode)>) -> Vec<Self> {
        fields
            .into_iter()
            .map(|(name, ty)| Self { name: name.to_string(), ty })
            .collect()
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Internal => "internal",
            Self::List => "list",
            Self::Map => "map",
            Self::Option => "option",
            Self::Tuple => "tuple",
            Self::Reference => "reference",
            Self::Struct => "struct",
            Self::Enum => "enum",
            Self::Variant => "variant",
        };
        f.write_str(s)
    }
}

impl ContractSchema {
    pub fn from_json_str(src: &str) -> Result<Self, LoadError> {
        crate::path_de::from_str_with_path(src)
    }

    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        crate::path_de::from_file_with_path(path)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
