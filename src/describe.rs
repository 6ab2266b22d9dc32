//! Type Descriptor Builder.
//!
//! Walks a [`SchemaNode`] tree top-down, rendering the three type views of every
//! node and registering each named type exactly once as a side effect. Named types
//! that are already registered, or are currently being expanded further up the
//! stack, come back as name references: this is what terminates traversal of
//! recursive schemas.
use indexmap::IndexMap;
use log::{trace, warn};

use crate::config::{CollisionPolicy, GeneratorConfig};
use crate::error::{GenError, GenResult};
use crate::ir::{TypeExpr, TypeNames, TypeViews, View};
use crate::primitive::PrimitiveCodecs;
use crate::registry::{ExtraInfo, RegistrationHook, TypeRegistry};
use crate::schema::{EnumSchema, FieldSchema, SchemaNode, StructSchema, VariantSchema};

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone)]
pub struct TypeDescriptor<'s> {
    pub type_schema: &'s SchemaNode,
    pub views: TypeViews,
    /// Only for registrable named types.
    pub names: Option<TypeNames>,
    pub shape: DescriptorShape<'s>,
    /// Constructor tag of an enum variant, resolved from its position in the parent.
    pub variant_tag: Option<u64>,
    /// Filled once by the registration hook.
    pub more_info: Option<ExtraInfo>,
}

#[derive(Debug, Clone)]
pub enum DescriptorShape<'s> {
    /// Primitives and containers, always rendered inline.
    Inline,
    /// A reference to a registered type; look it up by name for the expansion.
    NameRef,
    /// Struct or variant fields in schema order.
    Fields(IndexMap<String, TypeDescriptor<'s>>),
    /// Enum variants in schema order.
    Variants(IndexMap<String, VariantDescriptor<'s>>),
}

#[derive(Debug, Clone)]
pub struct VariantDescriptor<'s> {
    /// Always the expanded (fields-shaped) descriptor of the variant.
    pub descriptor: TypeDescriptor<'s>,
    pub variant_name: String,
    pub field_count: usize,
    pub tag: u64,
    pub flavor: VariantFlavor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantFlavor {
    TagOnly,
    Singleton,
    Fields,
}

pub struct DescriptorBuilder<'s, 'c> {
    registry: &'c mut TypeRegistry<'s>,
    primitives: &'c dyn PrimitiveCodecs,
    hook: &'c mut dyn RegistrationHook,
    config: &'c GeneratorConfig,
    /// Named types being expanded on the current stack.
    in_progress: IndexMap<String, &'s SchemaNode>,
    depth: usize,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl VariantFlavor {
    pub fn for_field_count(count: usize) -> Self {
        match count {
            0 => Self::TagOnly,
            1 => Self::Singleton,
            _ => Self::Fields,
        }
    }
}

impl<'s> TypeDescriptor<'s> {
    fn inline(type_schema: &'s SchemaNode, views: TypeViews, shape: DescriptorShape<'s>) -> Self {
        Self { type_schema, views, names: None, shape, variant_tag: None, more_info: None }
    }

    fn name_ref(type_schema: &'s SchemaNode, names: TypeNames) -> Self {
        Self {
            type_schema,
            views: names.as_refs(),
            names: Some(names),
            shape: DescriptorShape::NameRef,
            variant_tag: None,
            more_info: None,
        }
    }

    pub fn canonical_name(&self) -> Option<&str> {
        self.names.as_ref().map(|n| n.canonical.as_str())
    }

    pub fn is_name_ref(&self) -> bool {
        matches!(self.shape, DescriptorShape::NameRef)
    }

    pub fn fields(&self) -> Option<&IndexMap<String, TypeDescriptor<'s>>> {
        match &self.shape {
            DescriptorShape::Fields(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn variants(&self) -> Option<&IndexMap<String, VariantDescriptor<'s>>> {
        match &self.shape {
            DescriptorShape::Variants(variants) => Some(variants),
            _ => None,
        }
    }
}

impl<'s, 'c> DescriptorBuilder<'s, 'c> {
    pub fn new(
        registry: &'c mut TypeRegistry<'s>,
        primitives: &'c dyn PrimitiveCodecs,
        hook: &'c mut dyn RegistrationHook,
        config: &'c GeneratorConfig,
    ) -> Self {
        Self { registry, primitives, hook, config, in_progress: IndexMap::new(), depth: 0 }
    }

    /// Describe `node`. With `as_name_ref`, a registrable named type comes back as a
    /// reference to its registered name instead of its expansion.
    pub fn describe(
        &mut self,
        node: &'s SchemaNode,
        as_name_ref: bool,
        path: &str,
    ) -> GenResult<TypeDescriptor<'s>> {
        if self.depth >= self.config.max_depth {
            return Err(GenError::SchemaTooDeep { depth: self.config.max_depth, path: path.to_string() });
        }
        self.depth += 1;
        let out = self.describe_node(node, as_name_ref, path);
        self.depth -= 1;
        out
    }

    fn describe_node(
        &mut self,
        node: &'s SchemaNode,
        as_name_ref: bool,
        path: &str,
    ) -> GenResult<TypeDescriptor<'s>> {
        match node {
            SchemaNode::Internal { name } => {
                let spelling = self.primitives.spelling(name).ok_or_else(|| GenError::UnknownPrimitive {
                    name: name.clone(),
                    path: path.to_string(),
                })?;
                let views = TypeViews {
                    canonical: TypeExpr::Primitive(spelling.canonical.clone()),
                    ergonomic: TypeExpr::Primitive(spelling.canonical),
                    permissive: TypeExpr::Primitive(spelling.permissive),
                };
                Ok(TypeDescriptor::inline(node, views, DescriptorShape::Inline))
            }
            SchemaNode::Reference { .. } | SchemaNode::Tuple { .. } => Err(GenError::UnsupportedSchemaKind {
                kind: node.kind().to_string(),
                path: path.to_string(),
            }),
            SchemaNode::List { item_type } => {
                let item = self.describe(item_type, true, &format!("{path}[]"))?;
                let views = TypeViews::from_fn(|v| TypeExpr::Sequence(Box::new(item.views.get(v).clone())));
                Ok(TypeDescriptor::inline(node, views, DescriptorShape::Inline))
            }
            SchemaNode::Map { key_type, value_type } => {
                let key = self.describe(key_type, true, &format!("{path}{{key}}"))?;
                let value = self.describe(value_type, true, &format!("{path}{{value}}"))?;
                let views = TypeViews::from_fn(|v| {
                    TypeExpr::Mapping(Box::new(key.views.get(v).clone()), Box::new(value.views.get(v).clone()))
                });
                Ok(TypeDescriptor::inline(node, views, DescriptorShape::Inline))
            }
            SchemaNode::Option { some_type } => {
                let some = self.describe(some_type, true, &format!("{path}?"))?;
                let views = TypeViews::from_fn(|v| TypeExpr::Optional(Box::new(some.views.get(v).clone())));
                Ok(TypeDescriptor::inline(node, views, DescriptorShape::Inline))
            }
            SchemaNode::Struct(s) => self.describe_struct(node, s, as_name_ref, path),
            SchemaNode::Enum(e) => self.describe_enum(node, e, as_name_ref, path),
            SchemaNode::Variant(v) => {
                // outside its enum, a variant needs a structured id naming the parent
                let parent = v.parent_from_id().ok_or_else(|| GenError::OrphanVariant {
                    name: v.name.clone(),
                    module: node.module(),
                    path: path.to_string(),
                })?;
                self.describe_variant(node, v, &parent, v.tag.unwrap_or(0), as_name_ref, path)
            }
        }
    }

    fn describe_struct(
        &mut self,
        node: &'s SchemaNode,
        s: &'s StructSchema,
        as_name_ref: bool,
        path: &str,
    ) -> GenResult<TypeDescriptor<'s>> {
        if s.field_types.is_empty() {
            return Ok(TypeDescriptor::inline(
                node,
                TypeViews::uniform(TypeExpr::TagOnly),
                DescriptorShape::Fields(IndexMap::new()),
            ));
        }
        self.named(&s.name, node, as_name_ref, path, |this| {
            let fields = this.describe_fields(&s.name, &s.field_types, path)?;
            let views = record_views(&fields);
            Ok(TypeDescriptor {
                type_schema: node,
                views,
                names: Some(TypeNames::for_name(&s.name)),
                shape: DescriptorShape::Fields(fields),
                variant_tag: None,
                more_info: None,
            })
        })
    }

    fn describe_enum(
        &mut self,
        node: &'s SchemaNode,
        e: &'s EnumSchema,
        as_name_ref: bool,
        path: &str,
    ) -> GenResult<TypeDescriptor<'s>> {
        self.named(&e.name, node, as_name_ref, path, |this| {
            let mut variants: IndexMap<String, VariantDescriptor<'s>> = IndexMap::new();
            let mut cases: Vec<(String, TypeViews)> = Vec::with_capacity(e.variant_types.len());

            for (ix, variant_node) in e.variant_types.iter().enumerate() {
                let SchemaNode::Variant(v) = variant_node else {
                    return Err(GenError::UnsupportedSchemaKind {
                        kind: variant_node.kind().to_string(),
                        path: format!("{path}.variantTypes[{ix}]"),
                    });
                };
                if variants.contains_key(&v.name) {
                    return Err(GenError::DuplicateFieldName { owner: e.name.clone(), field: v.name.clone() });
                }
                let variant_path = format!("{path}.{}", v.name);
                let tag = v.tag.unwrap_or(ix as u64);
                let expanded = this.describe_variant(variant_node, v, &e.name, tag, false, &variant_path)?;
                // registered variants are referenced by name inside the union
                let case = match &expanded.names {
                    Some(names) => names.as_refs(),
                    None => expanded.views.clone(),
                };
                cases.push((v.name.clone(), case));
                let field_count = v.field_types.len();
                variants.insert(
                    v.name.clone(),
                    VariantDescriptor {
                        descriptor: expanded,
                        variant_name: v.name.clone(),
                        field_count,
                        tag,
                        flavor: VariantFlavor::for_field_count(field_count),
                    },
                );
            }

            let union = |view: View| {
                TypeExpr::TaggedUnion(cases.iter().map(|(name, views)| (name.clone(), views.get(view).clone())).collect())
            };
            let views = TypeViews {
                canonical: union(View::Canonical),
                ergonomic: TypeExpr::Intersected(Box::new(union(View::Ergonomic))),
                permissive: union(View::Permissive),
            };
            Ok(TypeDescriptor {
                type_schema: node,
                views,
                names: Some(TypeNames::for_name(&e.name)),
                shape: DescriptorShape::Variants(variants),
                variant_tag: None,
                more_info: None,
            })
        })
    }

    fn describe_variant(
        &mut self,
        node: &'s SchemaNode,
        v: &'s VariantSchema,
        parent: &str,
        tag: u64,
        as_name_ref: bool,
        path: &str,
    ) -> GenResult<TypeDescriptor<'s>> {
        let owner = format!("{parent}${}", v.name);
        if v.field_types.len() <= 1 {
            // tag-only and singleton variants stay inline
            let fields = self.describe_fields(&owner, &v.field_types, path)?;
            let views = record_views(&fields);
            let mut inline = TypeDescriptor::inline(node, views, DescriptorShape::Fields(fields));
            inline.variant_tag = Some(tag);
            return Ok(inline);
        }
        self.named(&owner, node, as_name_ref, path, |this| {
            let fields = this.describe_fields(&owner, &v.field_types, path)?;
            let views = record_views(&fields);
            Ok(TypeDescriptor {
                type_schema: node,
                views,
                names: Some(TypeNames::for_name(&owner)),
                shape: DescriptorShape::Fields(fields),
                variant_tag: Some(tag),
                more_info: None,
            })
        })
    }

    fn describe_fields(
        &mut self,
        owner: &str,
        field_types: &'s [FieldSchema],
        path: &str,
    ) -> GenResult<IndexMap<String, TypeDescriptor<'s>>> {
        let mut fields = IndexMap::with_capacity(field_types.len());
        for field in field_types {
            if fields.contains_key(&field.name) {
                return Err(GenError::DuplicateFieldName { owner: owner.to_string(), field: field.name.clone() });
            }
            let described = self.describe(&field.ty, true, &format!("{path}.{}", field.name))?;
            fields.insert(field.name.clone(), described);
        }
        Ok(fields)
    }

    /// Shared name handling for registrable types: reference short-circuit, cycle
    /// breaking, collision checks, and registration after expansion.
    fn named(
        &mut self,
        name: &str,
        node: &'s SchemaNode,
        as_name_ref: bool,
        path: &str,
        expand: impl FnOnce(&mut Self) -> GenResult<TypeDescriptor<'s>>,
    ) -> GenResult<TypeDescriptor<'s>> {
        let seen = self
            .registry
            .lookup(name)
            .map(|d| d.type_schema)
            .or_else(|| self.in_progress.get(name).copied());
        if let Some(first) = seen {
            self.check_collision(name, first, node, path)?;
            trace!("`{name}` already known, referencing it from {path}");
            return match self.registry.lookup(name) {
                Some(registered) if !as_name_ref => Ok(registered.clone()),
                _ => Ok(TypeDescriptor::name_ref(node, TypeNames::for_name(name))),
            };
        }

        self.in_progress.insert(name.to_string(), node);
        let expanded = expand(self);
        self.in_progress.shift_remove(name);
        let expanded = expanded?;

        self.registry.register(expanded.clone(), &mut *self.hook);
        if as_name_ref {
            return Ok(TypeDescriptor::name_ref(node, TypeNames::for_name(name)));
        }
        Ok(self.registry.lookup(name).cloned().unwrap_or(expanded))
    }

    fn check_collision(
        &self,
        name: &str,
        first: &'s SchemaNode,
        node: &'s SchemaNode,
        path: &str,
    ) -> GenResult<()> {
        if std::ptr::eq(first, node) || first == node {
            return Ok(());
        }
        match self.config.collision_policy {
            CollisionPolicy::Strict => Err(GenError::NameCollision { name: name.to_string(), path: path.to_string() }),
            CollisionPolicy::FirstWins => {
                warn!("`{name}` at {path} differs from its first registration; keeping the first");
                Ok(())
            }
        }
    }
}

/// Record rendering with single-field unwrapping and the zero-field marker.
fn record_views(fields: &IndexMap<String, TypeDescriptor<'_>>) -> TypeViews {
    match fields.len() {
        0 => TypeViews::uniform(TypeExpr::TagOnly),
        1 => fields[0].views.clone(),
        _ => TypeViews::from_fn(|v| {
            TypeExpr::Record(fields.iter().map(|(name, d)| (name.clone(), d.views.get(v).clone())).collect())
        }),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitive::LedgerPrimitives;
    use crate::registry::NoopHook;

    fn text() -> SchemaNode {
        SchemaNode::internal("String")
    }

    fn int() -> SchemaNode {
        SchemaNode::internal("Int")
    }

    fn describe_all<'s>(node: &'s SchemaNode, registry: &mut TypeRegistry<'s>) -> GenResult<TypeDescriptor<'s>> {
        let config = GeneratorConfig::default();
        let mut hook = NoopHook;
        let mut builder = DescriptorBuilder::new(registry, &LedgerPrimitives, &mut hook, &config);
        builder.describe(node, false, "root")
    }

    #[test]
    fn list_of_named_struct_references_it() {
        let pair = SchemaNode::structure("Pair", vec![("a", text()), ("b", int())]);
        let node = SchemaNode::list(pair);
        let mut registry = TypeRegistry::new();
        let d = describe_all(&node, &mut registry).unwrap();
        assert_eq!(d.views.canonical, TypeExpr::Sequence(Box::new(TypeExpr::Named("Pair".into()))));
        assert_eq!(d.views.permissive, TypeExpr::Sequence(Box::new(TypeExpr::Named("PairLike".into()))));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["Pair"]);
    }

    #[test]
    fn option_renders_absent_union_of_primitive() {
        let node = SchemaNode::option(int());
        let mut registry = TypeRegistry::new();
        let d = describe_all(&node, &mut registry).unwrap();
        assert_eq!(d.views.canonical, TypeExpr::Optional(Box::new(TypeExpr::Primitive("Int".into()))));
        assert_eq!(d.views.permissive, TypeExpr::Optional(Box::new(TypeExpr::Primitive("IntLike".into()))));
        assert!(registry.is_empty());
    }

    #[test]
    fn single_field_struct_unwraps() {
        let node = SchemaNode::structure("Wrapper", vec![("inner", int())]);
        let mut registry = TypeRegistry::new();
        let d = describe_all(&node, &mut registry).unwrap();
        assert_eq!(d.views.canonical, TypeExpr::Primitive("Int".into()));
        assert_eq!(d.canonical_name(), Some("Wrapper"));
    }

    #[test]
    fn variants_with_many_fields_register_under_parent_name() {
        let node = SchemaNode::enumeration(
            "Action",
            vec![
                SchemaNode::variant("Stop", vec![]),
                SchemaNode::variant("Move", vec![("x", int()), ("y", int())]),
            ],
        );
        let mut registry = TypeRegistry::new();
        let d = describe_all(&node, &mut registry).unwrap();
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["Action$Move", "Action"]);
        assert_eq!(
            d.views.canonical,
            TypeExpr::TaggedUnion(vec![
                ("Stop".into(), TypeExpr::TagOnly),
                ("Move".into(), TypeExpr::Named("Action$Move".into())),
            ])
        );
        assert!(matches!(d.views.ergonomic, TypeExpr::Intersected(_)));
        let variants = d.variants().unwrap();
        assert_eq!(variants["Move"].flavor, VariantFlavor::Fields);
        assert_eq!(variants["Move"].tag, 1);
    }

    #[test]
    fn registered_variant_keeps_its_position_tag() {
        let node = SchemaNode::enumeration(
            "Action",
            vec![
                SchemaNode::variant("Stop", vec![]),
                SchemaNode::variant("Turn", vec![("deg", int())]),
                SchemaNode::variant("Move", vec![("x", int()), ("y", int())]),
            ],
        );
        let mut registry = TypeRegistry::new();
        describe_all(&node, &mut registry).unwrap();
        assert_eq!(registry.lookup("Action$Move").unwrap().variant_tag, Some(2));
        assert_eq!(registry.lookup("Action").unwrap().variant_tag, None);
    }

    fn loose_variant(id: Option<&str>) -> SchemaNode {
        SchemaNode::Variant(VariantSchema {
            name: "Move".into(),
            id: id.map(str::to_string),
            tag: Some(3),
            field_types: vec![
                FieldSchema { name: "x".into(), ty: int() },
                FieldSchema { name: "y".into(), ty: int() },
            ],
        })
    }

    #[test]
    fn standalone_variant_needs_a_parent() {
        let node = SchemaNode::structure("Holder", vec![("m", loose_variant(None)), ("n", int())]);
        let mut registry = TypeRegistry::new();
        let err = describe_all(&node, &mut registry).unwrap_err();
        assert_eq!(err, GenError::OrphanVariant { name: "Move".into(), module: None, path: "root.m".into() });

        let node = loose_variant(Some("__module__motion__Move"));
        let mut registry = TypeRegistry::new();
        let err = describe_all(&node, &mut registry).unwrap_err();
        assert_eq!(
            err,
            GenError::OrphanVariant { name: "Move".into(), module: Some("motion".into()), path: "root".into() }
        );
        assert_eq!(err.to_string(), "variant `Move` at root has no parent enum (module `motion`)");
    }

    #[test]
    fn standalone_variant_registers_under_its_id_parent() {
        let node = loose_variant(Some("__module__motion__Action[]__Move"));
        let mut registry = TypeRegistry::new();
        let d = describe_all(&node, &mut registry).unwrap();
        assert_eq!(d.canonical_name(), Some("Action$Move"));
        assert_eq!(d.variant_tag, Some(3));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["Action$Move"]);
    }

    #[test]
    fn recursive_struct_terminates() {
        // Node { next: Option<Node> } expressed through a shared schema
        let leaf = SchemaNode::structure("Node", vec![("value", int())]);
        let node = SchemaNode::structure(
            "Node",
            vec![("value", int()), ("next", SchemaNode::option(leaf))],
        );
        let config = GeneratorConfig {
            collision_policy: CollisionPolicy::FirstWins,
            ..GeneratorConfig::default()
        };
        let mut registry = TypeRegistry::new();
        let mut hook = NoopHook;
        let mut builder = DescriptorBuilder::new(&mut registry, &LedgerPrimitives, &mut hook, &config);
        let d = builder.describe(&node, false, "root").unwrap();
        assert_eq!(
            d.views.canonical,
            TypeExpr::Record(vec![
                ("value".into(), TypeExpr::Primitive("Int".into())),
                ("next".into(), TypeExpr::Optional(Box::new(TypeExpr::Named("Node".into())))),
            ])
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn tuple_is_rejected_with_path() {
        let node = SchemaNode::structure(
            "Holder",
            vec![("t", SchemaNode::Tuple { item_types: vec![int()] }), ("n", int())],
        );
        let mut registry = TypeRegistry::new();
        let err = describe_all(&node, &mut registry).unwrap_err();
        assert_eq!(
            err,
            GenError::UnsupportedSchemaKind { kind: "tuple".into(), path: "root.t".into() }
        );
    }

    #[test]
    fn duplicate_fields_are_rejected() {
        let node = SchemaNode::structure("Dup", vec![("a", int()), ("a", text())]);
        let mut registry = TypeRegistry::new();
        let err = describe_all(&node, &mut registry).unwrap_err();
        assert!(matches!(err, GenError::DuplicateFieldName { ref field, .. } if field == "a"));
    }

    #[test]
    fn depth_guard_trips() {
        let mut node = int();
        for _ in 0..10 {
            node = SchemaNode::list(node);
        }
        let config = GeneratorConfig { max_depth: 4, ..GeneratorConfig::default() };
        let mut registry = TypeRegistry::new();
        let mut hook = NoopHook;
        let mut builder = DescriptorBuilder::new(&mut registry, &LedgerPrimitives, &mut hook, &config);
        let err = builder.describe(&node, false, "root").unwrap_err();
        assert!(matches!(err, GenError::SchemaTooDeep { depth: 4, .. }));
    }
}
