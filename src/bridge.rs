//! Bridge Assembler and the runtime bridge surface.
//!
//! Assembly is one synchronous pass: describe the datum type (if any), then the
//! activity type, into a fresh registry; then generate variant accessors. Any
//! error abandons the pass and no bridge is produced.
use indexmap::IndexMap;
use log::{debug, info};
use serde_json::{Map, Value};

use crate::accessor::{AccessorGenerator, Direction, EnumAccessors, VariantAccessor};
use crate::codec::{ValueCodec, find_variant};
use crate::config::GeneratorConfig;
use crate::data::{EncodedValue, LedgerData};
use crate::describe::{DescriptorBuilder, TypeDescriptor};
use crate::error::{BridgeError, BridgeResult, GenError, GenResult};
use crate::primitive::{LedgerPrimitives, PrimitiveCodecs};
use crate::registry::{NoopHook, RegistrationHook, TypeRegistry};
use crate::schema::{ContractSchema, EnumSchema, SchemaNode};

pub type DecodedValue = Value;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

pub struct BridgeAssembler {
    config: GeneratorConfig,
    hook: Box<dyn RegistrationHook>,
    primitives: Box<dyn PrimitiveCodecs>,
}

pub struct Bridge<'s> {
    contract: &'s ContractSchema,
    config: GeneratorConfig,
    registry: TypeRegistry<'s>,
    datum: Option<TypeDescriptor<'s>>,
    activity: TypeDescriptor<'s>,
    /// Activity-direction accessors for the activity root, when it is an enum.
    activity_accessors: Option<EnumAccessors>,
    /// Plain accessors for every registered enum, by name.
    type_accessors: IndexMap<String, EnumAccessors>,
    primitives: Box<dyn PrimitiveCodecs>,
}

/// Supplies the uniqueness seed for a deferred seeded construction.
pub trait SeedSource {
    fn seed(&self) -> Option<Value>;
}

/// Read/write access to one type.
pub struct TypeHelper<'b, 's> {
    bridge: &'b Bridge<'s>,
    descriptor: &'b TypeDescriptor<'s>,
}

/// Constructors for one enum's variants, possibly nested inside outer variants.
pub struct EnumHelper<'b, 's> {
    bridge: &'b Bridge<'s>,
    schema: &'s EnumSchema,
    accessors: &'b EnumAccessors,
    /// Tags of the enclosing variants, outermost first.
    wrap: Vec<u64>,
}

/// A seeded construction waiting for its seed. Non-seed fields are already encoded.
#[derive(Debug)]
pub struct PendingSeeded<'b, 's> {
    bridge: &'b Bridge<'s>,
    variant: String,
    seed_schema: &'s SchemaNode,
    seed_path: String,
    tag: u64,
    wrap: Vec<u64>,
    others: Vec<LedgerData>,
}

pub struct TypesView<'b, 's> {
    bridge: &'b Bridge<'s>,
}

// ————————————————————————————————————————————————————————————————————————————
// ASSEMBLY
// ————————————————————————————————————————————————————————————————————————————

impl Default for BridgeAssembler {
    fn default() -> Self {
        Self::new(GeneratorConfig::default())
    }
}

impl BridgeAssembler {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config, hook: Box::new(NoopHook), primitives: Box::new(LedgerPrimitives) }
    }

    pub fn with_hook(mut self, hook: impl RegistrationHook + 'static) -> Self {
        self.hook = Box::new(hook);
        self
    }

    pub fn with_primitives(mut self, primitives: impl PrimitiveCodecs + 'static) -> Self {
        self.primitives = Box::new(primitives);
        self
    }

    pub fn assemble<'s>(mut self, contract: &'s ContractSchema) -> GenResult<Bridge<'s>> {
        let activity_node = contract
            .activity
            .as_ref()
            .ok_or(GenError::MissingRequiredType("activity"))?;

        let mut registry = TypeRegistry::new();
        let (datum, activity) = {
            let mut builder =
                DescriptorBuilder::new(&mut registry, self.primitives.as_ref(), self.hook.as_mut(), &self.config);
            let datum = match &contract.datum {
                Some(node) => Some(builder.describe(node, false, "datum")?),
                None => None,
            };
            let activity = builder.describe(activity_node, false, "activity")?;
            (datum, activity)
        };

        let generator = AccessorGenerator::new(&registry, &self.config);
        let activity_accessors = match activity.type_schema {
            SchemaNode::Enum(_) => Some(generator.generate(&activity, Direction::Activity)?),
            _ => None,
        };
        let mut type_accessors = IndexMap::new();
        for descriptor in registry.enums() {
            let accessors = generator.generate(descriptor, Direction::Plain)?;
            type_accessors.insert(accessors.enum_name.clone(), accessors);
        }

        info!(
            "assembled bridge for `{}`: {} registered type(s), datum {}",
            contract.name,
            registry.len(),
            if datum.is_some() { "present" } else { "absent" }
        );

        Ok(Bridge {
            contract,
            config: self.config,
            registry,
            datum,
            activity,
            activity_accessors,
            type_accessors,
            primitives: self.primitives,
        })
    }
}

// ————————————————————————————————————————————————————————————————————————————
// BRIDGE
// ————————————————————————————————————————————————————————————————————————————

impl<'s> Bridge<'s> {
    pub fn contract(&self) -> &'s ContractSchema {
        self.contract
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn registry(&self) -> &TypeRegistry<'s> {
        &self.registry
    }

    pub fn activity_descriptor(&self) -> &TypeDescriptor<'s> {
        &self.activity
    }

    pub fn datum_descriptor(&self) -> Option<&TypeDescriptor<'s>> {
        self.datum.as_ref()
    }

    pub fn activity_accessors(&self) -> Option<&EnumAccessors> {
        self.activity_accessors.as_ref()
    }

    /// Plain (non-seeded) accessors of a registered enum.
    pub fn accessors(&self, enum_name: &str) -> Option<&EnumAccessors> {
        self.type_accessors.get(enum_name)
    }

    fn codec(&self) -> ValueCodec<'_> {
        ValueCodec::new(self.primitives.as_ref())
    }

    /// Activity-side constructors, including the seeded forms.
    pub fn activity(&self) -> BridgeResult<EnumHelper<'_, 's>> {
        let name = || self.activity.canonical_name().unwrap_or("activity").to_string();
        let schema = self.activity.type_schema.as_enum().ok_or_else(|| BridgeError::NotAnEnum(name()))?;
        let accessors = self.activity_accessors.as_ref().ok_or_else(|| BridgeError::NotAnEnum(name()))?;
        Ok(EnumHelper { bridge: self, schema, accessors, wrap: Vec::new() })
    }

    pub fn encode_activity(&self, variant: &str, fields: &Value) -> BridgeResult<EncodedValue> {
        let schema = self.activity()?.schema;
        if find_variant(schema, variant).is_none() {
            return Err(BridgeError::UnknownVariant { type_name: schema.name.clone(), variant: variant.to_string() });
        }
        let value = enum_value(variant, fields.clone());
        self.codec().encode(self.activity.type_schema, &value, "activity")
    }

    pub fn decode_activity(&self, data: &EncodedValue) -> BridgeResult<DecodedValue> {
        self.codec().decode(self.activity.type_schema, data, "activity")
    }

    /// `None` when the contract has no datum type.
    pub fn datum(&self) -> Option<TypeHelper<'_, 's>> {
        self.datum.as_ref().map(|descriptor| TypeHelper { bridge: self, descriptor })
    }

    /// `None` when the contract has no datum type.
    pub fn encode_datum(&self, value: &Value) -> Option<BridgeResult<EncodedValue>> {
        self.datum().map(|helper| helper.encode(value))
    }

    /// Decode a value of any registered type.
    pub fn decode(&self, type_name: &str, data: &EncodedValue) -> BridgeResult<DecodedValue> {
        let descriptor = self
            .registry
            .lookup(type_name)
            .ok_or_else(|| BridgeError::UnknownType(type_name.to_string()))?;
        self.codec().decode_described(descriptor, data, type_name)
    }

    pub fn types(&self) -> TypesView<'_, 's> {
        TypesView { bridge: self }
    }

    /// Render declarations and accessors as source text.
    pub fn emit(&self) -> String {
        crate::emit::emit_bridge(self)
    }
}

impl<'b, 's> TypesView<'b, 's> {
    pub fn get(&self, name: &str) -> Option<TypeHelper<'b, 's>> {
        let descriptor = self.bridge.registry.lookup(name)?;
        Some(TypeHelper { bridge: self.bridge, descriptor })
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<&'b str> {
        self.bridge.registry.names().collect()
    }
}

// ————————————————————————————————————————————————————————————————————————————
// HELPERS
// ————————————————————————————————————————————————————————————————————————————

impl<'b, 's> TypeHelper<'b, 's> {
    pub fn name(&self) -> Option<&'b str> {
        self.descriptor.canonical_name()
    }

    pub fn descriptor(&self) -> &'b TypeDescriptor<'s> {
        self.descriptor
    }

    fn path(&self) -> String {
        self.name().unwrap_or("value").to_string()
    }

    pub fn encode(&self, value: &Value) -> BridgeResult<EncodedValue> {
        self.bridge.codec().encode_described(self.descriptor, value, &self.path())
    }

    pub fn decode(&self, data: &EncodedValue) -> BridgeResult<DecodedValue> {
        self.bridge.codec().decode_described(self.descriptor, data, &self.path())
    }

    /// Plain variant constructors; fails for non-enum types.
    pub fn variants(&self) -> BridgeResult<EnumHelper<'b, 's>> {
        let schema = self
            .descriptor
            .type_schema
            .as_enum()
            .ok_or_else(|| BridgeError::NotAnEnum(self.path()))?;
        let accessors = self
            .bridge
            .type_accessors
            .get(&schema.name)
            .ok_or_else(|| BridgeError::NotAnEnum(self.path()))?;
        Ok(EnumHelper { bridge: self.bridge, schema, accessors, wrap: Vec::new() })
    }
}

impl<'b, 's> EnumHelper<'b, 's> {
    pub fn accessors(&self) -> &'b EnumAccessors {
        self.accessors
    }

    fn accessor(&self, variant: &str) -> BridgeResult<&'b VariantAccessor> {
        self.accessors.get(variant).ok_or_else(|| BridgeError::UnknownVariant {
            type_name: self.schema.name.clone(),
            variant: variant.to_string(),
        })
    }

    fn variant_schema(&self, variant: &str) -> BridgeResult<&'s crate::schema::VariantSchema> {
        find_variant(self.schema, variant).map(|(v, _)| v).ok_or_else(|| BridgeError::UnknownVariant {
            type_name: self.schema.name.clone(),
            variant: variant.to_string(),
        })
    }

    fn path(&self, variant: &str) -> String {
        format!("{}.{variant}", self.schema.name)
    }

    /// Encode through every enclosing variant, innermost first.
    fn wrap(&self, data: LedgerData) -> LedgerData {
        wrap_through(&self.wrap, data)
    }

    fn wrong(variant: &str, expected: &'static str, actual: &VariantAccessor) -> BridgeError {
        BridgeError::WrongAccessor { variant: variant.to_string(), expected, actual: actual.label() }
    }

    /// Zero-argument accessor of a tag-only variant.
    pub fn tag_only(&self, variant: &str) -> BridgeResult<EncodedValue> {
        match self.accessor(variant)? {
            VariantAccessor::TagOnly { tag } => Ok(self.wrap(LedgerData::constr(*tag, Vec::new()))),
            other => Err(Self::wrong(variant, "tag-only", other)),
        }
    }

    /// Singleton accessors take the field value; multi-field accessors take a record.
    /// A nested-enum variant takes the inner enum's value.
    pub fn construct(&self, variant: &str, fields: &Value) -> BridgeResult<EncodedValue> {
        let accessor = self.accessor(variant)?;
        let schema = self.variant_schema(variant)?;
        let path = self.path(variant);
        let codec = self.bridge.codec();
        let encoded = match accessor {
            VariantAccessor::Singleton { .. } | VariantAccessor::NestedEnum { .. } => {
                codec.encode_variant_fields(schema, Some(fields), &path)?
            }
            VariantAccessor::Fields { .. } => codec.encode_field_list(&schema.field_types, fields, &path)?,
            other => return Err(Self::wrong(variant, "singleton or fields", other)),
        };
        Ok(self.wrap(LedgerData::constr(accessor.tag(), encoded)))
    }

    /// Sub-accessor for a variant whose single field is an enum.
    pub fn nested(&self, variant: &str) -> BridgeResult<EnumHelper<'b, 's>> {
        let accessor = self.accessor(variant)?;
        let VariantAccessor::NestedEnum { tag, inner, .. } = accessor else {
            return Err(Self::wrong(variant, "nested-enum", accessor));
        };
        let schema = self.variant_schema(variant)?;
        let inner_schema = schema
            .field_types
            .first()
            .and_then(|f| f.ty.as_enum())
            .ok_or_else(|| Self::wrong(variant, "nested-enum", accessor))?;
        let mut wrap = self.wrap.clone();
        wrap.push(*tag);
        Ok(EnumHelper { bridge: self.bridge, schema: inner_schema, accessors: inner.as_ref(), wrap })
    }

    /// Direct seeded form: the seed is supplied now.
    pub fn seeded(&self, variant: &str, seed: &Value, fields: &Value) -> BridgeResult<EncodedValue> {
        self.deferred(variant, fields)?.fulfill(seed)
    }

    /// Deferred seeded form (`$seeded$<Variant>`): captures the non-seed fields and
    /// waits for the seed.
    pub fn deferred(&self, variant: &str, fields: &Value) -> BridgeResult<PendingSeeded<'b, 's>> {
        let accessor = self.accessor(variant)?;
        let VariantAccessor::Seeded { tag, .. } = accessor else {
            return Err(Self::wrong(variant, "seeded", accessor));
        };
        let schema = self.variant_schema(variant)?;
        let path = self.path(variant);
        let (seed_field, rest) = schema
            .field_types
            .split_first()
            .ok_or_else(|| Self::wrong(variant, "seeded", accessor))?;
        let others = self.bridge.codec().encode_field_list(rest, fields, &path)?;
        debug!("deferred seeded construction of {path}");
        Ok(PendingSeeded {
            bridge: self.bridge,
            variant: variant.to_string(),
            seed_schema: &seed_field.ty,
            seed_path: format!("{path}.{}", seed_field.name),
            tag: *tag,
            wrap: self.wrap.clone(),
            others,
        })
    }
}

impl<'b, 's> PendingSeeded<'b, 's> {
    pub fn variant(&self) -> &str {
        &self.variant
    }

    pub fn fulfill(self, seed: &Value) -> BridgeResult<EncodedValue> {
        let seed = self.bridge.codec().encode(self.seed_schema, seed, &self.seed_path)?;
        let mut fields = Vec::with_capacity(self.others.len() + 1);
        fields.push(seed);
        fields.extend(self.others);
        Ok(wrap_through(&self.wrap, LedgerData::constr(self.tag, fields)))
    }

    pub fn fulfill_from(self, source: &dyn SeedSource) -> BridgeResult<EncodedValue> {
        let seed = source.seed().ok_or(BridgeError::NoSeed)?;
        self.fulfill(&seed)
    }
}

impl SeedSource for Value {
    fn seed(&self) -> Option<Value> {
        Some(self.clone())
    }
}

impl std::fmt::Debug for Bridge<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("contract", &self.contract.name)
            .field("types", &self.registry.names().collect::<Vec<_>>())
            .field("datum", &self.datum.is_some())
            .finish()
    }
}

fn wrap_through(tags: &[u64], data: LedgerData) -> LedgerData {
    tags.iter().rev().fold(data, |inner, tag| LedgerData::constr(*tag, vec![inner]))
}

/// Build `{variant: payload}` for callers holding the pieces separately.
pub fn enum_value(variant: &str, payload: Value) -> Value {
    let mut out = Map::new();
    out.insert(variant.to_string(), payload);
    Value::Object(out)
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————
