//! Variant Accessor Generator.
//!
//! One accessor per enum variant, in schema order. Accessors are plain data; the
//! bridge interprets them when values are constructed.
use indexmap::IndexMap;

use crate::config::GeneratorConfig;
use crate::describe::{TypeDescriptor, VariantDescriptor, VariantFlavor};
use crate::error::{GenError, GenResult};
use crate::registry::TypeRegistry;

/// Which side of the contract an enum is written from. Only the activity side
/// gets the seeded construction pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Activity,
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumAccessors {
    pub enum_name: String,
    /// Taken from the registration hook's `helperClass`, when present.
    pub helper_class: Option<String>,
    pub variants: IndexMap<String, VariantAccessor>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantAccessor {
    /// Property-style; always the same discriminant.
    TagOnly { tag: u64 },
    Singleton { tag: u64, field: String },
    /// The single field is itself an enum; its constructors encode through `tag`.
    NestedEnum { tag: u64, field: String, inner: Box<EnumAccessors> },
    /// Direct form takes the seed; the deferred form (`$seeded$<Variant>`) waits for it.
    Seeded { tag: u64, seed_field: String, other_fields: Vec<String> },
    Fields { tag: u64, fields: Vec<String> },
}

pub struct AccessorGenerator<'a, 's> {
    registry: &'a TypeRegistry<'s>,
    config: &'a GeneratorConfig,
}

impl VariantAccessor {
    pub fn tag(&self) -> u64 {
        match self {
            Self::TagOnly { tag }
            | Self::Singleton { tag, .. }
            | Self::NestedEnum { tag, .. }
            | Self::Seeded { tag, .. }
            | Self::Fields { tag, .. } => *tag,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::TagOnly { .. } => "tag-only",
            Self::Singleton { .. } => "singleton",
            Self::NestedEnum { .. } => "nested-enum",
            Self::Seeded { .. } => "seeded",
            Self::Fields { .. } => "fields",
        }
    }
}

impl EnumAccessors {
    pub fn get(&self, variant: &str) -> Option<&VariantAccessor> {
        self.variants.get(variant)
    }

    /// Name of the deferred seeded form of `variant`.
    pub fn deferred_name(variant: &str) -> String {
        format!("$seeded${variant}")
    }
}

impl<'a, 's> AccessorGenerator<'a, 's> {
    pub fn new(registry: &'a TypeRegistry<'s>, config: &'a GeneratorConfig) -> Self {
        Self { registry, config }
    }

    pub fn generate(&self, descriptor: &TypeDescriptor<'s>, direction: Direction) -> GenResult<EnumAccessors> {
        let mut stack = Vec::new();
        self.generate_enum(self.resolve(descriptor), direction, &mut stack)
    }

    fn generate_enum(
        &self,
        descriptor: &TypeDescriptor<'s>,
        direction: Direction,
        stack: &mut Vec<String>,
    ) -> GenResult<EnumAccessors> {
        let enum_name = descriptor.canonical_name().unwrap_or_default().to_string();
        let helper_class = descriptor
            .more_info
            .as_ref()
            .and_then(|info| info.get("helperClass"))
            .and_then(|v| v.as_str())
            .map(str::to_string);

        stack.push(enum_name.clone());
        let mut variants = IndexMap::new();
        if let Some(described) = descriptor.variants() {
            for (name, variant) in described {
                let accessor = self.generate_variant(variant, direction, stack)?;
                variants.insert(name.clone(), accessor);
            }
        }
        stack.pop();

        Ok(EnumAccessors { enum_name, helper_class, variants })
    }

    fn generate_variant(
        &self,
        variant: &VariantDescriptor<'s>,
        direction: Direction,
        stack: &mut Vec<String>,
    ) -> GenResult<VariantAccessor> {
        let invalid = || GenError::InvalidVariantFlavor {
            variant: variant.variant_name.clone(),
            field_count: variant.field_count,
        };
        let fields = variant.descriptor.fields().ok_or_else(invalid)?;
        if fields.len() != variant.field_count {
            return Err(invalid());
        }
        let tag = variant.tag;
        let seeded = direction == Direction::Activity;
        let seed_name = self.config.seed_field_name.as_str();

        match (variant.flavor, variant.field_count) {
            (VariantFlavor::TagOnly, 0) => Ok(VariantAccessor::TagOnly { tag }),
            (VariantFlavor::Singleton, 1) => {
                let (field, field_descriptor) = fields.get_index(0).ok_or_else(invalid)?;
                if seeded && field == seed_name {
                    return Ok(VariantAccessor::Seeded {
                        tag,
                        seed_field: field.clone(),
                        other_fields: Vec::new(),
                    });
                }
                let inner = self.resolve(field_descriptor);
                let on_stack = inner.canonical_name().is_some_and(|n| stack.iter().any(|s| s == n));
                if inner.type_schema.is_enum() && !on_stack {
                    let inner = self.generate_enum(inner, direction, stack)?;
                    return Ok(VariantAccessor::NestedEnum { tag, field: field.clone(), inner: Box::new(inner) });
                }
                // a self-nesting enum falls back to a direct accessor
                Ok(VariantAccessor::Singleton { tag, field: field.clone() })
            }
            (VariantFlavor::Fields, n) if n >= 2 => {
                let names: Vec<String> = fields.keys().cloned().collect();
                if seeded && names[0] == seed_name {
                    let mut names = names.into_iter();
                    let seed_field = names.next().unwrap_or_default();
                    return Ok(VariantAccessor::Seeded { tag, seed_field, other_fields: names.collect() });
                }
                Ok(VariantAccessor::Fields { tag, fields: names })
            }
            _ => Err(invalid()),
        }
    }

    /// Follow a name reference to the registered expansion.
    fn resolve<'d>(&'d self, descriptor: &'d TypeDescriptor<'s>) -> &'d TypeDescriptor<'s> {
        if !descriptor.is_name_ref() {
            return descriptor;
        }
        descriptor
            .canonical_name()
            .and_then(|name| self.registry.lookup(name))
            .unwrap_or(descriptor)
    }
}
