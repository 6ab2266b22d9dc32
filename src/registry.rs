//! Named Type Registry.
//!
//! Insertion-ordered, first-write-wins. Iteration order is the emission order.
use indexmap::IndexMap;
use log::{debug, trace};
use serde_json::json;

use crate::describe::TypeDescriptor;
use crate::schema::SchemaKind;

/// Opaque value a hook attaches to a registered type.
pub type ExtraInfo = serde_json::Value;

/// Collaborator invoked exactly once per registration. Every method is optional.
pub trait RegistrationHook {
    fn on_register_struct(&mut self, _descriptor: &TypeDescriptor<'_>) -> Option<ExtraInfo> {
        None
    }

    fn on_register_enum(&mut self, _descriptor: &TypeDescriptor<'_>) -> Option<ExtraInfo> {
        None
    }

    fn on_register_variant(&mut self, _descriptor: &TypeDescriptor<'_>) -> Option<ExtraInfo> {
        None
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHook;

impl RegistrationHook for NoopHook {}

/// Names a helper class for every struct and enum, e.g. `RoleHelper`.
#[derive(Debug, Clone, Copy, Default)]
pub struct HelperClassHook;

impl RegistrationHook for HelperClassHook {
    fn on_register_struct(&mut self, descriptor: &TypeDescriptor<'_>) -> Option<ExtraInfo> {
        helper_class(descriptor)
    }

    fn on_register_enum(&mut self, descriptor: &TypeDescriptor<'_>) -> Option<ExtraInfo> {
        helper_class(descriptor)
    }
}

fn helper_class(descriptor: &TypeDescriptor<'_>) -> Option<ExtraInfo> {
    let name = descriptor.canonical_name()?;
    Some(json!({ "helperClass": format!("{name}Helper") }))
}

#[derive(Debug, Default, Clone)]
pub struct TypeRegistry<'s> {
    entries: IndexMap<String, TypeDescriptor<'s>>,
}

impl<'s> TypeRegistry<'s> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `descriptor` under its canonical name unless the name is taken.
    /// Returns whether the descriptor was stored. Anonymous descriptors are ignored.
    pub fn register(&mut self, mut descriptor: TypeDescriptor<'s>, hook: &mut dyn RegistrationHook) -> bool {
        let Some(name) = descriptor.canonical_name().map(str::to_string) else {
            return false;
        };
        if self.entries.contains_key(&name) {
            trace!("skipping re-registration of `{name}`");
            return false;
        }
        descriptor.more_info = match descriptor.type_schema.kind() {
            SchemaKind::Struct => hook.on_register_struct(&descriptor),
            SchemaKind::Enum => hook.on_register_enum(&descriptor),
            SchemaKind::Variant => hook.on_register_variant(&descriptor),
            _ => None,
        };
        debug!("registered {} `{name}`", descriptor.type_schema.kind());
        self.entries.insert(name, descriptor);
        true
    }

    pub fn lookup(&self, name: &str) -> Option<&TypeDescriptor<'s>> {
        self.entries.get(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypeDescriptor<'s>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn enums(&self) -> impl Iterator<Item = &TypeDescriptor<'s>> {
        self.entries.values().filter(|d| d.type_schema.is_enum())
    }
}
