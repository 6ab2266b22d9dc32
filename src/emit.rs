// Textual emitter. Renders the `TypeExpr` IR, the registry and the accessor tables;
// nothing here inspects schemas.
use crate::accessor::{EnumAccessors, VariantAccessor};
use crate::bridge::Bridge;
use crate::ir::{TypeExpr, View};
use crate::registry::TypeRegistry;

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

/// Render one type expression.
pub fn render_expr(expr: &TypeExpr) -> String {
    match expr {
        TypeExpr::Primitive(name) | TypeExpr::Named(name) => name.clone(),
        TypeExpr::Sequence(item) => format!("Sequence<{}>", render_expr(item)),
        TypeExpr::Mapping(key, value) => format!("Mapping<{}, {}>", render_expr(key), render_expr(value)),
        TypeExpr::Optional(some) => format!("{} | Absent", render_expr(some)),
        TypeExpr::Record(fields) => {
            let fields: Vec<String> = fields
                .iter()
                .map(|(name, ty)| format!("{name}: {}", render_expr(ty)))
                .collect();
            format!("{{ {} }}", fields.join(", "))
        }
        TypeExpr::TaggedUnion(cases) if cases.is_empty() => "Never".to_string(),
        TypeExpr::TaggedUnion(cases) => cases
            .iter()
            .map(|(name, ty)| format!("{{ {name}: {} }}", render_expr(ty)))
            .collect::<Vec<_>>()
            .join(" | "),
        TypeExpr::Intersected(inner) => format!("Intersected<{}>", render_expr(inner)),
        TypeExpr::TagOnly => "TagOnly".to_string(),
    }
}

/// The three declarations of every registered type, in registration order.
pub fn emit_declarations(registry: &TypeRegistry<'_>) -> Vec<String> {
    let mut lines = Vec::new();
    for (_, descriptor) in registry.iter() {
        let Some(names) = &descriptor.names else {
            continue;
        };
        for view in [View::Canonical, View::Permissive, View::Ergonomic] {
            lines.push(format!("type {} = {};", names.get(view), render_expr(descriptor.views.get(view))));
        }
    }
    lines
}

/// One accessor table. `label` prefixes the header line.
pub fn emit_accessors(label: &str, accessors: &EnumAccessors) -> Vec<String> {
    let mut lines = Vec::new();
    let helper = accessors
        .helper_class
        .as_ref()
        .map(|class| format!(" via {class}"))
        .unwrap_or_default();
    lines.push(format!("{label} {}{helper} {{", accessors.enum_name));
    push_variants(accessors, 1, &mut lines);
    lines.push("}".to_string());
    lines
}

/// Full text of an assembled bridge: declarations, then the activity table, then
/// the plain table of every other enum.
pub fn emit_bridge(bridge: &Bridge<'_>) -> String {
    let mut blocks: Vec<Vec<String>> = vec![emit_declarations(bridge.registry())];
    let activity_name = bridge.activity_accessors().map(|a| a.enum_name.as_str());
    if let Some(activity) = bridge.activity_accessors() {
        blocks.push(emit_accessors("activity", activity));
    }
    for name in bridge.registry().names() {
        if Some(name) == activity_name {
            continue;
        }
        if let Some(accessors) = bridge.accessors(name) {
            blocks.push(emit_accessors("accessors", accessors));
        }
    }
    let mut out = blocks
        .into_iter()
        .filter(|block| !block.is_empty())
        .map(|block| block.join("\n"))
        .collect::<Vec<_>>()
        .join("\n\n");
    out.push('\n');
    out
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn push_variants(accessors: &EnumAccessors, depth: usize, lines: &mut Vec<String>) {
    let indent = "    ".repeat(depth);
    for (name, accessor) in &accessors.variants {
        match accessor {
            VariantAccessor::TagOnly { tag } => lines.push(format!("{indent}{name}: tag-only #{tag}")),
            VariantAccessor::Singleton { tag, field } => {
                lines.push(format!("{indent}{name}({field}): singleton #{tag}"))
            }
            VariantAccessor::Fields { tag, fields } => {
                lines.push(format!("{indent}{name}({}): fields #{tag}", fields.join(", ")))
            }
            VariantAccessor::Seeded { tag, seed_field, other_fields } => {
                let all: Vec<&str> = std::iter::once(seed_field.as_str())
                    .chain(other_fields.iter().map(String::as_str))
                    .collect();
                lines.push(format!("{indent}{name}({}): seeded #{tag}", all.join(", ")));
                lines.push(format!(
                    "{indent}{}({}): deferred #{tag}",
                    EnumAccessors::deferred_name(name),
                    other_fields.join(", ")
                ));
            }
            VariantAccessor::NestedEnum { tag, field, inner } => {
                lines.push(format!("{indent}{name}({field}): nested-enum #{tag} -> {} {{", inner.enum_name));
                push_variants(inner, depth + 1, lines);
                lines.push(format!("{indent}}}"));
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// TESTS
// ————————————————————————————————————————————————————————————————————————————

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    #[test]
    fn renders_nested_expressions() {
        let expr = TypeExpr::Sequence(Box::new(TypeExpr::Optional(Box::new(TypeExpr::Record(vec![
            ("a".into(), TypeExpr::Primitive("Int".into())),
            ("b".into(), TypeExpr::Mapping(Box::new(TypeExpr::Primitive("Text".into())), Box::new(TypeExpr::Named("Pair".into())))),
        ])))));
        assert_eq!(render_expr(&expr), "Sequence<{ a: Int, b: Mapping<Text, Pair> } | Absent>");
    }

    #[test]
    fn renders_unions() {
        let union = TypeExpr::TaggedUnion(vec![
            ("Close".into(), TypeExpr::TagOnly),
            ("Rename".into(), TypeExpr::Primitive("Text".into())),
        ]);
        assert_eq!(render_expr(&union), "{ Close: TagOnly } | { Rename: Text }");
        assert_eq!(
            render_expr(&TypeExpr::Intersected(Box::new(union))),
            "Intersected<{ Close: TagOnly } | { Rename: Text }>"
        );
        assert_eq!(render_expr(&TypeExpr::TaggedUnion(vec![])), "Never");
    }

    #[test]
    fn lists_deferred_seeded_form() {
        let mut variants = IndexMap::new();
        variants.insert(
            "Mint".to_string(),
            VariantAccessor::Seeded { tag: 0, seed_field: "seed".into(), other_fields: vec!["amount".into()] },
        );
        let accessors = EnumAccessors { enum_name: "Activity".into(), helper_class: None, variants };
        assert_eq!(
            emit_accessors("activity", &accessors),
            vec![
                "activity Activity {".to_string(),
                "    Mint(seed, amount): seeded #0".to_string(),
                "    $seeded$Mint(amount): deferred #0".to_string(),
                "}".to_string(),
            ]
        );
    }
}
